use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use crate::models::event::{emit_event, DeviceEvent, DeviceEventSender};

struct BufferState {
    open: bool,
    running: bool,
    queue: VecDeque<u8>,
    capacity: usize,
    sink: Option<DeviceEventSender>,
}

impl BufferState {
    fn emit(&self, event: DeviceEvent) {
        if let Some(ref sink) = self.sink {
            emit_event(sink, event);
        }
    }
}

/// Bounded byte FIFO plus open/running flags, giving a device line the
/// blocking `read` contract of `InputLine`.
///
/// Producers (a driver callback, a test) `push` bytes; the capture thread
/// `read`s whole chunks. Transitions emit the matching `DeviceEvent`.
pub struct LineBuffer {
    state: Mutex<BufferState>,
    changed: Condvar,
}

impl LineBuffer {
    /// A new open, stopped buffer holding at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(BufferState {
                open: true,
                running: false,
                queue: VecDeque::with_capacity(capacity),
                capacity,
                sink: None,
            }),
            changed: Condvar::new(),
        }
    }

    /// Queue bytes for reading. Overflow drops the oldest bytes.
    pub fn push(&self, bytes: &[u8]) {
        let mut state = self.state.lock();
        if !state.open {
            return;
        }
        state.queue.extend(bytes);
        let overflow = state.queue.len().saturating_sub(state.capacity);
        if overflow > 0 {
            log::debug!("Line buffer overflow, dropping {} bytes", overflow);
            state.queue.drain(..overflow);
        }
        drop(state);
        self.changed.notify_all();
    }

    pub fn queued(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Returns `true` if the buffer transitioned to running.
    pub fn start(&self) -> bool {
        let mut state = self.state.lock();
        let started = state.open && !state.running;
        if started {
            state.running = true;
            state.emit(DeviceEvent::Started);
        }
        drop(state);
        self.changed.notify_all();
        started
    }

    /// Returns `true` if the buffer transitioned to stopped.
    pub fn stop(&self) -> bool {
        let mut state = self.state.lock();
        let stopped = state.running;
        if stopped {
            state.running = false;
            state.emit(DeviceEvent::Stopped);
        }
        drop(state);
        self.changed.notify_all();
        stopped
    }

    /// Returns `true` if the buffer transitioned to closed.
    pub fn close(&self) -> bool {
        let mut state = self.state.lock();
        let closed = state.open;
        if closed {
            state.open = false;
            state.running = false;
            state.queue.clear();
            state.emit(DeviceEvent::Closed);
        }
        drop(state);
        self.changed.notify_all();
        closed
    }

    pub fn flush(&self) {
        self.state.lock().queue.clear();
    }

    /// Block until `buf.len()` bytes are queued, the buffer stops with less
    /// than that queued, or it closes.
    pub fn read(&self, buf: &mut [u8]) -> usize {
        let len = buf.len();
        let mut state = self.state.lock();
        loop {
            if !state.open {
                return 0;
            }
            if state.queue.len() >= len {
                break;
            }
            if !state.running {
                return 0;
            }
            self.changed.wait(&mut state);
        }
        for (dst, src) in buf.iter_mut().zip(state.queue.drain(..len)) {
            *dst = src;
        }
        len
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Install the event sink, announcing `Opened` if the buffer is open.
    pub fn subscribe(&self, sink: DeviceEventSender) {
        let mut state = self.state.lock();
        if state.open {
            emit_event(&sink, DeviceEvent::Opened);
        }
        state.sink = Some(sink);
    }

    /// Deliver an event that did not come from a buffer transition.
    pub fn emit(&self, event: DeviceEvent) {
        self.state.lock().emit(event);
    }
}
