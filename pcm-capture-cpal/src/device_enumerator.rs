//! Input device discovery and format negotiation over the default cpal host.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::SampleFormat;

use pcm_capture_core::{CaptureError, FormatDescriptor};

/// An input device as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDeviceInfo {
    pub name: String,
    pub is_default: bool,
    pub max_channels: u16,
    pub min_sample_rate: u32,
    pub max_sample_rate: u32,
}

/// List input devices on the default host.
pub fn list_input_devices() -> Result<Vec<InputDeviceInfo>, CaptureError> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());
    let devices = host
        .input_devices()
        .map_err(|e| CaptureError::DeviceNotAvailable(format!("failed to enumerate inputs: {}", e)))?;

    let mut infos = Vec::new();
    for device in devices {
        let Ok(name) = device.name() else {
            continue;
        };
        let ranges: Vec<_> = match device.supported_input_configs() {
            Ok(configs) => configs.collect(),
            Err(e) => {
                log::debug!("Skipping {}: {}", name, e);
                continue;
            }
        };
        if ranges.is_empty() {
            continue;
        }
        infos.push(InputDeviceInfo {
            is_default: default_name.as_deref() == Some(name.as_str()),
            max_channels: ranges.iter().map(|r| r.channels()).max().unwrap_or(0),
            min_sample_rate: ranges.iter().map(|r| r.min_sample_rate().0).min().unwrap_or(0),
            max_sample_rate: ranges.iter().map(|r| r.max_sample_rate().0).max().unwrap_or(0),
            name,
        });
    }
    Ok(infos)
}

/// Resolve a device by name, or the host default when `name` is `None`.
pub(crate) fn find_device(name: Option<&str>) -> Result<cpal::Device, CaptureError> {
    let host = cpal::default_host();
    match name {
        None => host
            .default_input_device()
            .ok_or_else(|| CaptureError::DeviceNotAvailable("no default input device".into())),
        Some(name) => host
            .input_devices()
            .map_err(|e| CaptureError::DeviceNotAvailable(format!("failed to enumerate inputs: {}", e)))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| CaptureError::DeviceNotAvailable(format!("input device '{}' not found", name))),
    }
}

/// Pick the native sample format to capture `format` with, if any.
pub(crate) fn select_sample_format(
    device: &cpal::Device,
    format: &FormatDescriptor,
) -> Option<SampleFormat> {
    let ranges = device.supported_input_configs().ok()?;
    preferred_sample_format(
        ranges.map(|r| (r.channels(), r.min_sample_rate().0, r.max_sample_rate().0, r.sample_format())),
        format,
    )
}

/// Among `(channels, min_rate, max_rate, sample_format)` ranges matching
/// `format`, prefer native i16 and fall back to f32.
fn preferred_sample_format(
    ranges: impl IntoIterator<Item = (u16, u32, u32, SampleFormat)>,
    format: &FormatDescriptor,
) -> Option<SampleFormat> {
    let rate = format.sample_rate.round() as u32;
    let candidates: Vec<SampleFormat> = ranges
        .into_iter()
        .filter(|&(channels, min, max, _)| channels == format.channels && min <= rate && rate <= max)
        .map(|(_, _, _, sample_format)| sample_format)
        .collect();

    [SampleFormat::I16, SampleFormat::F32]
        .into_iter()
        .find(|preferred| candidates.contains(preferred))
}
