use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use parking_lot::{Condvar, Mutex};

use crate::models::event::DeviceEvent;
use crate::models::format::FormatDescriptor;
use crate::models::state::RunState;
use crate::processing::channel_buffer::InputBuffers;
use crate::traits::input_device::InputLine;

/// How long a parked capture thread sleeps before re-checking device events.
pub(crate) const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Control block shared by the controller and one capture thread.
///
/// Lock order: `state` before any line-internal lock. Line methods are
/// only called with `state` held or with no session lock at all.
pub(crate) struct SessionControl {
    pub(crate) state: Mutex<RunState>,
    pub(crate) wake: Condvar,
    events: Receiver<DeviceEvent>,
    pub(crate) chunks_captured: AtomicU64,
    pub(crate) short_reads: AtomicU64,
    pub(crate) device_events: AtomicU64,
}

impl SessionControl {
    pub(crate) fn new(events: Receiver<DeviceEvent>) -> Self {
        Self {
            state: Mutex::new(RunState::Stopped),
            wake: Condvar::new(),
            events,
            chunks_captured: AtomicU64::new(0),
            short_reads: AtomicU64::new(0),
            device_events: AtomicU64::new(0),
        }
    }

    /// Drain pending device events into `state`.
    ///
    /// Each event is confirmed against the line first, so echoes of
    /// transitions the controller already reversed are ignored.
    pub(crate) fn apply_device_events(&self, state: &mut RunState, line: &dyn InputLine) {
        for event in self.events.try_iter() {
            self.device_events.fetch_add(1, Ordering::Relaxed);
            match event {
                DeviceEvent::Stopped if *state == RunState::Running && !line.is_running() => {
                    log::info!("Input line stopped by device, pausing capture");
                    *state = RunState::Stopped;
                }
                DeviceEvent::Closed if *state != RunState::Closing && !line.is_open() => {
                    log::warn!("Input line closed by device, ending capture");
                    *state = RunState::Closing;
                }
                other => log::debug!("Device event {:?}", other),
            }
        }
    }

    /// Current state after applying pending device events.
    pub(crate) fn poll(&self, line: &dyn InputLine) -> RunState {
        let mut state = self.state.lock();
        self.apply_device_events(&mut state, line);
        *state
    }

    /// Align `state` with the line after a short read.
    ///
    /// Covers device-initiated transitions whose event was dropped.
    fn reconcile(&self, line: &dyn InputLine) -> RunState {
        let mut state = self.state.lock();
        self.apply_device_events(&mut state, line);
        if *state != RunState::Closing && !line.is_open() {
            *state = RunState::Closing;
        } else if *state == RunState::Running && !line.is_running() {
            *state = RunState::Stopped;
        }
        *state
    }
}

/// Body of the capture thread: the only writer of `buffers`.
///
/// Parks while stopped, exits once the state reaches `Closing`, and
/// otherwise reads one full chunk per iteration and publishes it.
pub(crate) fn run_capture_loop(
    line: Arc<dyn InputLine>,
    control: Arc<SessionControl>,
    buffers: Arc<InputBuffers>,
    format: FormatDescriptor,
) {
    let mut scratch = vec![0u8; format.chunk_size_bytes()];

    loop {
        {
            let mut state = control.state.lock();
            loop {
                control.apply_device_events(&mut state, line.as_ref());
                match *state {
                    RunState::Closing => return,
                    RunState::Running => break,
                    RunState::Stopped => {
                        control.wake.wait_for(&mut state, EVENT_POLL_INTERVAL);
                    }
                }
            }
        }

        let read = line.read(&mut scratch);
        if read < scratch.len() {
            if control.reconcile(line.as_ref()) != RunState::Closing {
                control.short_reads.fetch_add(1, Ordering::Relaxed);
                log::debug!("Short read: {} of {} bytes", read, scratch.len());
            }
            continue;
        }

        control.chunks_captured.fetch_add(1, Ordering::Relaxed);
        buffers.publish(&scratch, &format);
    }
}
