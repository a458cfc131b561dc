//! In-memory input device.
//!
//! Serves PCM bytes queued with `push` through the same blocking `read`
//! contract a hardware line has. Used by tests and for replaying captured
//! audio without hardware.

use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::device::line_buffer::LineBuffer;
use crate::models::error::CaptureError;
use crate::models::event::DeviceEventSender;
use crate::models::format::FormatDescriptor;
use crate::traits::input_device::{InputDevice, InputLine};

struct DeviceInner {
    name: String,
    available: AtomicBool,
    max_channels: AtomicU16,
    opens: AtomicUsize,
    line: Mutex<Option<Arc<MemoryLine>>>,
}

/// Clonable handle to an in-memory device; clones share the same line.
#[derive(Clone)]
pub struct MemoryInputDevice {
    inner: Arc<DeviceInner>,
}

impl MemoryInputDevice {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(DeviceInner {
                name: name.into(),
                available: AtomicBool::new(true),
                max_channels: AtomicU16::new(2),
                opens: AtomicUsize::new(0),
                line: Mutex::new(None),
            }),
        }
    }

    /// Make subsequent `open` calls fail with `DeviceNotAvailable`.
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    /// Highest channel count `supports_format` accepts (default: 2).
    pub fn set_max_channels(&self, channels: u16) {
        self.inner.max_channels.store(channels, Ordering::SeqCst);
    }

    /// Number of successful `open` calls so far.
    pub fn open_count(&self) -> usize {
        self.inner.opens.load(Ordering::SeqCst)
    }

    /// The most recently opened line, if it is still open.
    pub fn line(&self) -> Option<Arc<MemoryLine>> {
        self.inner.line.lock().clone().filter(|line| line.is_open())
    }

    /// Queue raw PCM bytes on the open line. Returns `false` if no line is open.
    pub fn push(&self, bytes: &[u8]) -> bool {
        match self.line() {
            Some(line) => {
                line.buffer.push(bytes);
                true
            }
            None => false,
        }
    }

    /// Simulate the device going away underneath an open line.
    pub fn disconnect(&self) {
        if let Some(line) = self.line() {
            log::info!("Simulating disconnect of {}", self.inner.name);
            line.buffer.stop();
            line.buffer.close();
        }
    }
}

impl InputDevice for MemoryInputDevice {
    fn supports_format(&self, format: &FormatDescriptor) -> bool {
        format.validate().is_ok() && format.channels <= self.inner.max_channels.load(Ordering::SeqCst)
    }

    fn open(
        &mut self,
        format: &FormatDescriptor,
        buffer_bytes: usize,
    ) -> Result<Arc<dyn InputLine>, CaptureError> {
        if !self.inner.available.load(Ordering::SeqCst) {
            return Err(CaptureError::DeviceNotAvailable(format!(
                "{} is unavailable",
                self.inner.name
            )));
        }
        if !self.supports_format(format) {
            return Err(CaptureError::UnsupportedFormat(format!(
                "{} channel(s) at {} Hz",
                format.channels, format.sample_rate
            )));
        }

        let mut current = self.inner.line.lock();
        if current.as_ref().is_some_and(|line| line.is_open()) {
            return Err(CaptureError::DeviceNotAvailable(format!(
                "{} is already in use",
                self.inner.name
            )));
        }

        let line = Arc::new(MemoryLine {
            buffer: LineBuffer::new(buffer_bytes.max(format.chunk_size_bytes())),
        });
        *current = Some(Arc::clone(&line));
        self.inner.opens.fetch_add(1, Ordering::SeqCst);
        Ok(line)
    }

    fn name(&self) -> String {
        self.inner.name.clone()
    }
}

/// Line handed out by `MemoryInputDevice::open`.
pub struct MemoryLine {
    buffer: LineBuffer,
}

impl MemoryLine {
    /// Bytes queued and not yet read.
    pub fn queued(&self) -> usize {
        self.buffer.queued()
    }
}

impl InputLine for MemoryLine {
    fn start(&self) {
        self.buffer.start();
    }

    fn stop(&self) {
        self.buffer.stop();
    }

    fn close(&self) {
        self.buffer.close();
    }

    fn flush(&self) {
        self.buffer.flush();
    }

    fn read(&self, buf: &mut [u8]) -> usize {
        self.buffer.read(buf)
    }

    fn is_open(&self) -> bool {
        self.buffer.is_open()
    }

    fn is_running(&self) -> bool {
        self.buffer.is_running()
    }

    fn subscribe(&self, sink: DeviceEventSender) {
        self.buffer.subscribe(sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::DeviceEvent;

    #[test]
    fn unavailable_device_fails_to_open() {
        let mut device = MemoryInputDevice::new("test");
        device.set_available(false);

        let result = device.open(&FormatDescriptor::default(), 4096);

        assert!(matches!(result, Err(CaptureError::DeviceNotAvailable(_))));
        assert_eq!(device.open_count(), 0);
    }

    #[test]
    fn rejects_unsupported_channel_count() {
        let mut device = MemoryInputDevice::new("mono-only");
        device.set_max_channels(1);

        assert!(!device.supports_format(&FormatDescriptor::stereo(44100.0)));
        let result = device.open(&FormatDescriptor::stereo(44100.0), 4096);
        assert!(matches!(result, Err(CaptureError::UnsupportedFormat(_))));
    }

    #[test]
    fn second_open_while_in_use_fails() {
        let mut device = MemoryInputDevice::new("test");
        let line = device.open(&FormatDescriptor::default(), 4096).unwrap();

        let result = device.open(&FormatDescriptor::default(), 4096);
        assert!(matches!(result, Err(CaptureError::DeviceNotAvailable(_))));

        line.close();
        assert!(device.open(&FormatDescriptor::default(), 4096).is_ok());
        assert_eq!(device.open_count(), 2);
    }

    #[test]
    fn push_targets_open_line() {
        let mut device = MemoryInputDevice::new("test");
        assert!(!device.push(&[0; 4]));

        let line = device.open(&FormatDescriptor::default(), 4096).unwrap();
        assert!(device.push(&[0; 4]));
        assert_eq!(device.line().unwrap().queued(), 4);

        line.close();
        assert!(!device.push(&[0; 4]));
    }

    #[test]
    fn disconnect_emits_stop_then_close() {
        let mut device = MemoryInputDevice::new("test");
        let line = device.open(&FormatDescriptor::default(), 4096).unwrap();
        let (tx, rx) = crossbeam_channel::bounded(8);
        line.subscribe(tx);
        line.start();

        device.disconnect();

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                DeviceEvent::Opened,
                DeviceEvent::Started,
                DeviceEvent::Stopped,
                DeviceEvent::Closed,
            ]
        );
        assert!(!line.is_open());
        assert!(device.line().is_none());
    }
}
