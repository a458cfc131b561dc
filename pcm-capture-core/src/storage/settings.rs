use std::fs;
use std::path::Path;

use crate::models::config::EngineSettings;
use crate::models::error::CaptureError;

/// Write engine settings as pretty-printed JSON.
pub fn write_settings(settings: &EngineSettings, path: &Path) -> Result<(), CaptureError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| CaptureError::StorageError(format!("failed to create directory: {}", e)))?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| CaptureError::StorageError(format!("failed to serialize settings: {}", e)))?;
    fs::write(path, json)
        .map_err(|e| CaptureError::StorageError(format!("failed to write settings: {}", e)))?;
    Ok(())
}

/// Read engine settings written by `write_settings`.
pub fn read_settings(path: &Path) -> Result<EngineSettings, CaptureError> {
    let json = fs::read_to_string(path)
        .map_err(|e| CaptureError::StorageError(format!("failed to read settings: {}", e)))?;
    let settings: EngineSettings = serde_json::from_str(&json)
        .map_err(|e| CaptureError::StorageError(format!("failed to parse settings: {}", e)))?;
    settings.validate().map_err(CaptureError::ConfigurationFailed)?;
    Ok(settings)
}
