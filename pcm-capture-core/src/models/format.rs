use serde::{Deserialize, Serialize};

/// Bytes per 16-bit PCM sample.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Samples per channel delivered by one capture chunk.
pub const DEFAULT_BUFFER_LENGTH: usize = 512;

/// Default capture rate in Hz.
pub const DEFAULT_SAMPLE_RATE: f64 = 44100.0;

/// Byte order of the 16-bit samples in the raw device stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

/// Describes the raw PCM layout the device is opened with.
///
/// Bit depth is fixed at 16. Sizes are derived on every call so a changed
/// descriptor can never leave a stale chunk size behind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    /// Sample rate in Hz (default: 44100).
    pub sample_rate: f64,

    /// 1 for mono, 2 for interleaved stereo (default: 2).
    pub channels: u16,

    /// Sample byte order (default: little-endian).
    pub byte_order: ByteOrder,

    /// Samples per channel in each capture chunk (default: 512).
    pub buffer_length: usize,
}

impl FormatDescriptor {
    pub fn new(sample_rate: f64, channels: u16, byte_order: ByteOrder) -> Self {
        Self {
            sample_rate,
            channels,
            byte_order,
            buffer_length: DEFAULT_BUFFER_LENGTH,
        }
    }

    pub fn mono(sample_rate: f64) -> Self {
        Self::new(sample_rate, 1, ByteOrder::Little)
    }

    pub fn stereo(sample_rate: f64) -> Self {
        Self::new(sample_rate, 2, ByteOrder::Little)
    }

    pub fn with_buffer_length(mut self, buffer_length: usize) -> Self {
        self.buffer_length = buffer_length;
        self
    }

    pub fn bits_per_sample(&self) -> u16 {
        (BYTES_PER_SAMPLE * 8) as u16
    }

    pub fn is_stereo(&self) -> bool {
        self.channels == 2
    }

    /// Bytes per interleaved frame: `2 * channels`.
    pub fn frame_size_bytes(&self) -> usize {
        BYTES_PER_SAMPLE * self.channels as usize
    }

    /// Bytes read from the device per capture iteration.
    pub fn chunk_size_bytes(&self) -> usize {
        self.buffer_length * self.frame_size_bytes()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate.is_nan() || self.sample_rate <= 0.0 {
            return Err("sample rate must be positive".into());
        }
        if ![1, 2].contains(&self.channels) {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        if self.buffer_length == 0 {
            return Err("buffer length must be non-zero".into());
        }
        Ok(())
    }
}

impl Default for FormatDescriptor {
    fn default() -> Self {
        Self::stereo(DEFAULT_SAMPLE_RATE)
    }
}
