use std::sync::Arc;

use crate::models::config::EngineSettings;
use crate::models::error::CaptureError;
use crate::processing::level_meter::LevelMeter;
use crate::session::controller::AudioInputController;
use crate::traits::input_device::InputDevice;

/// Maps a single enable toggle onto input lifecycle calls and keeps the
/// level meter in lockstep with it.
///
/// Enabling opens (if needed) and starts the input. Disabling only stops
/// it, keeping the device and capture thread bound for a quick resume.
pub struct AudioEngine<D: InputDevice> {
    enabled: bool,
    input: AudioInputController<D>,
    meter: Arc<LevelMeter>,
}

impl<D: InputDevice> AudioEngine<D> {
    pub fn new(input: AudioInputController<D>) -> Self {
        let meter = Arc::new(LevelMeter::new(input.buffers()));
        Self {
            enabled: false,
            input,
            meter,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn input(&self) -> &AudioInputController<D> {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut AudioInputController<D> {
        &mut self.input
    }

    /// Meter bound to the current input. Replaced by `change_input`, so
    /// consumers should re-fetch it after a swap.
    pub fn meter(&self) -> Arc<LevelMeter> {
        Arc::clone(&self.meter)
    }

    /// Apply the enable toggle.
    ///
    /// A device that cannot be opened leaves the engine enabled but inert
    /// (meter off); only caller misuse is returned as an error.
    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), CaptureError> {
        if self.enabled != enabled {
            log::info!("Audio engine {}", if enabled { "enabled" } else { "disabled" });
        }
        self.enabled = enabled;
        self.apply_policy()
    }

    /// Swap in a new input. The previous one is closed (its capture thread
    /// joined) before the new one is started, and the meter is rebound to
    /// the new buffers with its settings kept.
    ///
    /// Returns the previous, now closed, controller.
    pub fn change_input(
        &mut self,
        input: AudioInputController<D>,
    ) -> Result<AudioInputController<D>, CaptureError> {
        self.meter.set_running(false);
        if let Err(e) = self.input.close() {
            // The thread is joined either way; nothing can still write.
            log::error!("Previous audio input did not shut down cleanly: {}", e);
        }

        let previous = std::mem::replace(&mut self.input, input);
        self.meter = Arc::new(LevelMeter::with_settings(
            self.input.buffers(),
            self.meter.settings(),
        ));
        log::info!("Audio input changed to {}", self.input.device().name());

        self.apply_policy()?;
        Ok(previous)
    }

    pub fn settings(&self) -> EngineSettings {
        EngineSettings {
            enabled: self.enabled,
            meter: self.meter.settings(),
        }
    }

    pub fn apply_settings(&mut self, settings: EngineSettings) -> Result<(), CaptureError> {
        settings.validate().map_err(CaptureError::ConfigurationFailed)?;
        self.meter.set_settings(settings.meter);
        self.set_enabled(settings.enabled)
    }

    /// Stop metering and close the input.
    pub fn shutdown(&mut self) -> Result<(), CaptureError> {
        self.meter.set_running(false);
        self.input.close()
    }

    fn apply_policy(&mut self) -> Result<(), CaptureError> {
        if self.enabled {
            match self.input.open() {
                Ok(()) => {}
                Err(e) if e.is_recoverable() => {
                    log::error!("Audio input unavailable, engine stays inert: {}", e);
                    self.meter.set_running(false);
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
            self.input.start()?;
        } else if self.input.state().is_open() {
            self.input.stop()?;
        }
        self.meter.set_running(self.enabled);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::memory::MemoryInputDevice;
    use crate::models::config::MeterSettings;
    use crate::models::format::FormatDescriptor;
    use crate::models::state::LifecycleState;

    fn input(name: &str) -> (MemoryInputDevice, AudioInputController<MemoryInputDevice>) {
        let device = MemoryInputDevice::new(name);
        let format = FormatDescriptor::stereo(44100.0).with_buffer_length(4);
        let controller = AudioInputController::with_format(device.clone(), format).unwrap();
        (device, controller)
    }

    #[test]
    fn starts_disabled_and_closed() {
        let (_device, controller) = input("a");
        let mut engine = AudioEngine::new(controller);

        engine.set_enabled(false).unwrap();

        assert!(!engine.is_enabled());
        assert_eq!(engine.input().state(), LifecycleState::Closed);
        assert!(!engine.meter().is_running());
    }

    #[test]
    fn toggle_drives_lifecycle_and_meter() {
        let (device, controller) = input("a");
        let mut engine = AudioEngine::new(controller);

        engine.set_enabled(true).unwrap();
        assert_eq!(engine.input().state(), LifecycleState::OpenRunning);
        assert!(engine.meter().is_running());

        engine.set_enabled(false).unwrap();
        assert_eq!(engine.input().state(), LifecycleState::OpenStopped);
        assert!(!engine.meter().is_running());

        engine.set_enabled(true).unwrap();
        assert_eq!(engine.input().state(), LifecycleState::OpenRunning);
        assert_eq!(device.open_count(), 1);
    }

    #[test]
    fn unavailable_device_leaves_engine_inert() {
        let (device, controller) = input("a");
        device.set_available(false);
        let mut engine = AudioEngine::new(controller);

        engine.set_enabled(true).unwrap();

        assert!(engine.is_enabled());
        assert_eq!(engine.input().state(), LifecycleState::Closed);
        assert!(!engine.meter().is_running());
    }

    #[test]
    fn change_input_closes_old_and_keeps_policy() {
        let (old_device, old) = input("old");
        let (new_device, new) = input("new");
        let mut engine = AudioEngine::new(old);
        engine.set_enabled(true).unwrap();
        let old_buffers = engine.input().buffers();

        let previous = engine.change_input(new).unwrap();

        assert_eq!(previous.state(), LifecycleState::Closed);
        assert!(old_device.line().is_none());
        assert_eq!(engine.input().state(), LifecycleState::OpenRunning);
        assert_eq!(new_device.open_count(), 1);
        assert!(engine.meter().is_running());
        assert!(Arc::ptr_eq(engine.meter().buffers(), &engine.input().buffers()));
        assert!(!Arc::ptr_eq(engine.meter().buffers(), &old_buffers));
    }

    #[test]
    fn change_input_while_disabled_leaves_new_closed() {
        let (_old_device, old) = input("old");
        let (new_device, new) = input("new");
        let mut engine = AudioEngine::new(old);

        engine.change_input(new).unwrap();

        assert_eq!(engine.input().state(), LifecycleState::Closed);
        assert_eq!(new_device.open_count(), 0);
    }

    #[test]
    fn meter_settings_survive_swap() {
        let (_old_device, old) = input("old");
        let (_new_device, new) = input("new");
        let mut engine = AudioEngine::new(old);
        let settings = EngineSettings {
            enabled: false,
            meter: MeterSettings {
                gain_db: 6.0,
                peak_decay: 0.5,
            },
        };
        engine.apply_settings(settings).unwrap();

        engine.change_input(new).unwrap();

        assert_eq!(engine.settings(), settings);
    }

    #[test]
    fn apply_settings_validates() {
        let (_device, controller) = input("a");
        let mut engine = AudioEngine::new(controller);
        let mut settings = EngineSettings::default();
        settings.meter.peak_decay = 2.0;

        let result = engine.apply_settings(settings);

        assert!(matches!(result, Err(CaptureError::ConfigurationFailed(_))));
    }

    #[test]
    fn shutdown_closes_input() {
        let (device, controller) = input("a");
        let mut engine = AudioEngine::new(controller);
        engine.set_enabled(true).unwrap();

        engine.shutdown().unwrap();

        assert_eq!(engine.input().state(), LifecycleState::Closed);
        assert!(device.line().is_none());
        assert!(!engine.meter().is_running());
    }
}
