//! # pcm-capture-cpal
//!
//! cpal backend for pcm-capture-core. One `InputDevice` implementation
//! covers WASAPI (Windows), CoreAudio (macOS) and ALSA (Linux).
//!
//! Provides:
//! - `CpalInputDevice` — default or named input device
//! - `list_input_devices` — enumeration of input devices
//!
//! ## Usage
//! ```ignore
//! use pcm_capture_core::{AudioEngine, AudioInputController};
//! use pcm_capture_cpal::CpalInputDevice;
//!
//! let input = AudioInputController::new(CpalInputDevice::default_device());
//! let mut engine = AudioEngine::new(input);
//! engine.set_enabled(true)?;
//! let levels = engine.meter().poll();
//! ```

pub mod cpal_input;
pub mod device_enumerator;

pub use cpal_input::{CpalInputDevice, CpalLine};
pub use device_enumerator::{list_input_devices, InputDeviceInfo};
