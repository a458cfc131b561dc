//! # pcm-capture-core
//!
//! Platform-agnostic realtime PCM input capture.
//!
//! A dedicated capture thread blocks on device reads, de-interleaves 16-bit
//! frames into per-channel buffers and computes a mix buffer. Downstream
//! consumers (level meters, audio-reactive generators) poll those buffers
//! once per frame. Platform backends implement the `InputDevice` trait.
//!
//! ## Architecture
//!
//! ```text
//! pcm-capture-core (this crate)
//! ├── traits/       ← InputDevice, InputLine
//! ├── models/       ← CaptureError, LifecycleState, FormatDescriptor, DeviceEvent, settings
//! ├── processing/   ← ChannelBuffer, InputBuffers, PCM decoding, LevelMeter
//! ├── session/      ← AudioInputController (+ capture thread), AudioEngine
//! ├── device/       ← LineBuffer, MemoryInputDevice
//! └── storage/      ← settings JSON
//! ```

pub mod device;
pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use device::line_buffer::LineBuffer;
pub use device::memory::{MemoryInputDevice, MemoryLine};
pub use models::audio_models::{AudioLevels, CaptureDiagnostics};
pub use models::config::{EngineSettings, MeterSettings};
pub use models::error::CaptureError;
pub use models::event::{DeviceEvent, DeviceEventSender};
pub use models::format::{ByteOrder, FormatDescriptor};
pub use models::state::LifecycleState;
pub use processing::channel_buffer::{BufferFrame, ChannelBuffer, InputBuffers};
pub use processing::level_meter::LevelMeter;
pub use session::controller::AudioInputController;
pub use session::engine::AudioEngine;
pub use traits::input_device::{InputDevice, InputLine};
