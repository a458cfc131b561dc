use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::AudioLevels;
use crate::models::config::MeterSettings;
use crate::processing::channel_buffer::InputBuffers;

/// Downstream consumer that turns the last captured frame into levels.
///
/// Polled once per rendering tick, never pushed to. While not running it
/// reports nothing so stale buffers are not mistaken for live input.
pub struct LevelMeter {
    buffers: Arc<InputBuffers>,
    running: AtomicBool,
    settings: Mutex<MeterSettings>,
    held_peak: Mutex<f32>,
}

impl LevelMeter {
    pub fn new(buffers: Arc<InputBuffers>) -> Self {
        Self::with_settings(buffers, MeterSettings::default())
    }

    pub fn with_settings(buffers: Arc<InputBuffers>, settings: MeterSettings) -> Self {
        Self {
            buffers,
            running: AtomicBool::new(false),
            settings: Mutex::new(settings),
            held_peak: Mutex::new(0.0),
        }
    }

    /// Buffers this meter reads from.
    pub fn buffers(&self) -> &Arc<InputBuffers> {
        &self.buffers
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_running(&self, running: bool) {
        if !self.running.swap(running, Ordering::SeqCst) && running {
            *self.held_peak.lock() = 0.0;
        }
    }

    pub fn settings(&self) -> MeterSettings {
        *self.settings.lock()
    }

    pub fn set_settings(&self, settings: MeterSettings) {
        *self.settings.lock() = settings;
    }

    /// Measure the last complete frame. Returns `None` while not running.
    pub fn poll(&self) -> Option<AudioLevels> {
        if !self.is_running() {
            return None;
        }
        let settings = self.settings();
        let gain = settings.linear_gain();

        let (left, right, mix, peak) = self.buffers.with_frame(|frame| {
            (
                frame.left.rms_level(),
                frame.right.rms_level(),
                frame.mix.rms_level(),
                frame.mix.peak_level(),
            )
        });

        let peak_mix_level = (peak * gain).min(1.0);
        let held_peak = {
            let mut held = self.held_peak.lock();
            *held = (*held * settings.peak_decay).max(peak_mix_level);
            *held
        };

        Some(AudioLevels {
            left_level: (left * gain).min(1.0),
            right_level: (right * gain).min(1.0),
            mix_level: (mix * gain).min(1.0),
            peak_mix_level,
            held_peak,
        })
    }
}
