use std::sync::Arc;

use crate::models::error::CaptureError;
use crate::models::event::DeviceEventSender;
use crate::models::format::FormatDescriptor;

/// Platform audio input capability.
///
/// Implemented by:
/// - `MemoryInputDevice` (in-memory, for tests and replay)
/// - `CpalInputDevice` (cpal: WASAPI / CoreAudio / ALSA)
pub trait InputDevice: Send {
    /// Whether any line can be opened with `format`.
    fn supports_format(&self, format: &FormatDescriptor) -> bool;

    /// Acquire a line configured for `format`, buffering up to
    /// `buffer_bytes` internally. The returned line starts stopped.
    fn open(
        &mut self,
        format: &FormatDescriptor,
        buffer_bytes: usize,
    ) -> Result<Arc<dyn InputLine>, CaptureError>;

    /// Human-readable name for log lines.
    fn name(&self) -> String;
}

/// An open input line.
///
/// Shared between the controller (lifecycle calls) and the capture thread
/// (`read`), so every method takes `&self`.
pub trait InputLine: Send + Sync {
    fn start(&self);

    fn stop(&self);

    /// Release the line. Must unblock any pending `read`.
    fn close(&self);

    /// Discard buffered data.
    fn flush(&self);

    /// Block until `buf` is full, or until the line is stopped or closed.
    ///
    /// Returns the number of bytes written to `buf`; anything short of
    /// `buf.len()` is an incomplete chunk.
    fn read(&self, buf: &mut [u8]) -> usize;

    fn is_open(&self) -> bool;

    fn is_running(&self) -> bool;

    /// Register the sink lifecycle events are delivered to. Replaces any
    /// previous sink.
    fn subscribe(&self, sink: DeviceEventSender);
}
