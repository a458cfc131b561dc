use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::audio_models::CaptureDiagnostics;
use crate::models::error::CaptureError;
use crate::models::event::DEVICE_EVENT_CAPACITY;
use crate::models::format::FormatDescriptor;
use crate::models::state::{LifecycleState, RunState};
use crate::processing::channel_buffer::InputBuffers;
use crate::session::capture_thread::{self, SessionControl};
use crate::traits::input_device::{InputDevice, InputLine};

/// Binding between an open line and its capture thread. Exists only
/// while the device is open.
struct CaptureSession {
    id: Uuid,
    opened_at: DateTime<Utc>,
    line: Arc<dyn InputLine>,
    control: Arc<SessionControl>,
    handle: Option<thread::JoinHandle<()>>,
}

/// Owns one input device, its capture thread and the channel buffers the
/// thread fills.
///
/// ```text
/// closed ──open──▶ open_stopped ◀──stop/start──▶ open_running
///    ▲                  │                             │
///    └──────────────────┴───────────close─────────────┘
/// ```
///
/// `close` joins the capture thread before returning, so once it returns
/// the buffers are never written again.
pub struct AudioInputController<D: InputDevice> {
    device: D,
    format: FormatDescriptor,
    buffers: Arc<InputBuffers>,
    session: Option<CaptureSession>,
}

impl<D: InputDevice> AudioInputController<D> {
    pub fn new(device: D) -> Self {
        let format = FormatDescriptor::default();
        Self {
            device,
            format,
            buffers: Arc::new(InputBuffers::new(format.buffer_length)),
            session: None,
        }
    }

    pub fn with_format(device: D, format: FormatDescriptor) -> Result<Self, CaptureError> {
        let mut controller = Self::new(device);
        controller.set_format(format)?;
        Ok(controller)
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn format(&self) -> &FormatDescriptor {
        &self.format
    }

    /// Replace the capture format. Only allowed while closed.
    ///
    /// A changed descriptor discards the last published frame and its
    /// sequence.
    pub fn set_format(&mut self, format: FormatDescriptor) -> Result<(), CaptureError> {
        self.reap_device_closed()?;
        if self.session.is_some() {
            return Err(CaptureError::InvalidState(
                "close the input before changing its format".into(),
            ));
        }
        format.validate().map_err(CaptureError::ConfigurationFailed)?;
        if format != self.format {
            self.format = format;
            self.buffers.reset(format.buffer_length);
        }
        Ok(())
    }

    /// Channel buffers written by the capture thread.
    pub fn buffers(&self) -> Arc<InputBuffers> {
        Arc::clone(&self.buffers)
    }

    pub fn state(&self) -> LifecycleState {
        match &self.session {
            Some(session) => session.control.poll(session.line.as_ref()).lifecycle(),
            None => LifecycleState::Closed,
        }
    }

    /// Counters for the open session. `None` whenever `state()` is `Closed`.
    pub fn diagnostics(&self) -> Option<CaptureDiagnostics> {
        let session = self.session.as_ref()?;
        if session.control.poll(session.line.as_ref()) == RunState::Closing {
            return None;
        }
        Some(CaptureDiagnostics {
            session_id: session.id,
            opened_at: session.opened_at,
            chunks_captured: session.control.chunks_captured.load(Ordering::Relaxed),
            short_reads: session.control.short_reads.load(Ordering::Relaxed),
            device_events: session.control.device_events.load(Ordering::Relaxed),
        })
    }

    /// Open the device and spawn a paused capture thread.
    ///
    /// No-op while already open. Failures leave the controller closed and
    /// are logged as well as returned.
    pub fn open(&mut self) -> Result<(), CaptureError> {
        self.reap_device_closed()?;
        if self.session.is_some() {
            return Ok(());
        }

        let format = self.format;
        if !self.device.supports_format(&format) {
            let err = CaptureError::UnsupportedFormat(format!(
                "{} does not support {}-channel 16-bit input at {} Hz",
                self.device.name(),
                format.channels,
                format.sample_rate
            ));
            log::warn!("{}", err);
            return Err(err);
        }

        let buffer_bytes = format.chunk_size_bytes() * format.channels as usize;
        let line = self.device.open(&format, buffer_bytes).map_err(|e| {
            log::warn!("Failed to open {}: {}", self.device.name(), e);
            e
        })?;

        let (events_tx, events_rx) = crossbeam_channel::bounded(DEVICE_EVENT_CAPACITY);
        line.subscribe(events_tx);
        let control = Arc::new(SessionControl::new(events_rx));

        let handle = {
            let line = Arc::clone(&line);
            let control = Arc::clone(&control);
            let buffers = Arc::clone(&self.buffers);
            thread::Builder::new()
                .name("pcm-capture".into())
                .spawn(move || capture_thread::run_capture_loop(line, control, buffers, format))
        };
        let handle = match handle {
            Ok(handle) => handle,
            Err(e) => {
                line.close();
                let err = CaptureError::StreamError(format!("failed to spawn capture thread: {}", e));
                log::error!("{}", err);
                return Err(err);
            }
        };

        let id = Uuid::new_v4();
        log::info!(
            "Opened {} (session {}): {} ch, {} Hz, {} byte chunks",
            self.device.name(),
            id,
            format.channels,
            format.sample_rate,
            format.chunk_size_bytes()
        );

        self.session = Some(CaptureSession {
            id,
            opened_at: Utc::now(),
            line,
            control,
            handle: Some(handle),
        });
        Ok(())
    }

    /// Resume the line and wake the capture thread.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        self.reap_device_closed()?;
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| CaptureError::InvalidState("cannot start() before open()".into()))?;

        let mut state = session.control.state.lock();
        session.control.apply_device_events(&mut state, session.line.as_ref());
        if *state == RunState::Closing {
            return Err(CaptureError::DeviceNotAvailable(
                "input device closed before start()".into(),
            ));
        }
        if *state == RunState::Stopped {
            session.line.start();
            *state = RunState::Running;
            session.control.wake.notify_all();
            log::info!("Capture started (session {})", session.id);
        }
        Ok(())
    }

    /// Pause the line and mark the capture thread paused. The thread and
    /// the device binding stay alive for a quick resume.
    pub fn stop(&mut self) -> Result<(), CaptureError> {
        self.reap_device_closed()?;
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| CaptureError::InvalidState("cannot stop() before open()".into()))?;

        let mut state = session.control.state.lock();
        session.control.apply_device_events(&mut state, session.line.as_ref());
        if *state == RunState::Running {
            *state = RunState::Stopped;
            session.line.stop();
            log::info!("Capture stopped (session {})", session.id);
        }
        Ok(())
    }

    /// Flush, stop and release the device, then join the capture thread.
    ///
    /// Idempotent. Blocks until the thread has exited; a read the device
    /// never returns from will block here too.
    pub fn close(&mut self) -> Result<(), CaptureError> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };

        session.line.flush();
        {
            let mut state = session.control.state.lock();
            if *state == RunState::Running {
                session.line.stop();
            }
            *state = RunState::Closing;
            session.line.close();
            session.control.wake.notify_all();
        }

        let joined = session.handle.take().map(|handle| handle.join());
        log::info!(
            "Closed {} (session {}, {} chunks captured)",
            self.device.name(),
            session.id,
            session.control.chunks_captured.load(Ordering::Relaxed)
        );

        match joined {
            Some(Err(_)) => {
                log::error!("Capture thread for session {} panicked", session.id);
                Err(CaptureError::CaptureThreadPanicked)
            }
            _ => Ok(()),
        }
    }

    /// Tear down a session whose line was closed by the device.
    fn reap_device_closed(&mut self) -> Result<(), CaptureError> {
        let closed = self
            .session
            .as_ref()
            .is_some_and(|session| session.control.poll(session.line.as_ref()) == RunState::Closing);
        if closed {
            log::warn!("Input device closed underneath the controller, releasing session");
            self.close()?;
        }
        Ok(())
    }
}

impl<D: InputDevice> Drop for AudioInputController<D> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::error!("Failed to close audio input on drop: {}", e);
        }
    }
}
