/// Lifecycle notification raised by a device line.
///
/// Delivered asynchronously, possibly from a thread that is neither the
/// caller's nor the capture thread. Only `Stopped` and `Closed` change
/// controller state; `Opened` and `Started` are informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceEvent {
    Opened,
    Started,
    Stopped,
    Closed,
}

/// Capacity of the bounded channel device events are delivered on.
pub const DEVICE_EVENT_CAPACITY: usize = 16;

/// Sending half handed to a line via `InputLine::subscribe`.
pub type DeviceEventSender = crossbeam_channel::Sender<DeviceEvent>;

/// Deliver an event without blocking the device's notification thread.
///
/// A full channel drops the event; notifications are best effort.
pub fn emit_event(sink: &DeviceEventSender, event: DeviceEvent) {
    match sink.try_send(event) {
        Ok(()) => {}
        Err(crossbeam_channel::TrySendError::Full(event)) => {
            log::warn!("Device event channel full, dropping {:?}", event);
        }
        Err(crossbeam_channel::TrySendError::Disconnected(_)) => {}
    }
}
