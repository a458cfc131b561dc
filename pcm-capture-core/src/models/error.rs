use thiserror::Error;

/// Errors that can occur during audio input operations.
///
/// `UnsupportedFormat` and `DeviceNotAvailable` are environmental and only
/// arise when opening a device; callers recover by leaving the pipeline
/// closed. `InvalidState` means the caller drove the lifecycle wrongly.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("device not available: {0}")]
    DeviceNotAvailable(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("capture thread panicked before shutdown completed")]
    CaptureThreadPanicked,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("stream error: {0}")]
    StreamError(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

impl CaptureError {
    /// Whether this is an open-time condition the pipeline can sit out.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat(_) | Self::DeviceNotAvailable(_) | Self::StreamError(_)
        )
    }
}
