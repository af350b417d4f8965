//! Audio Device Enumeration and Lookup

use std::fmt;

use cpal::traits::{DeviceTrait, HostTrait};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Direction of an audio device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
    Capture,
    Playback,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::Capture => f.write_str("capture"),
            DeviceType::Playback => f.write_str("playback"),
        }
    }
}

/// Represents an audio device (capture or playback)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioDevice {
    /// Human-readable device name (also what `--capture`/`--playback` match)
    pub name: String,

    /// Whether this is a capture or playback device
    pub device_type: DeviceType,

    /// Whether this is the system default device
    pub is_default: bool,

    /// Supported sample rates (may be empty if querying failed)
    pub sample_rates: Vec<u32>,

    /// Maximum supported channels
    pub max_channels: u16,
}

impl AudioDevice {
    /// Enumerate all available audio devices
    pub fn enumerate_all() -> EngineResult<Vec<AudioDevice>> {
        let host = cpal::default_host();

        let mut devices = Vec::new();

        // Get default device names for comparison
        let default_input_name = host.default_input_device().and_then(|d| d.name().ok());
        let default_output_name = host.default_output_device().and_then(|d| d.name().ok());

        if let Ok(input_devices) = host.input_devices() {
            for device in input_devices {
                if let Ok(audio_device) = Self::from_cpal_device(
                    &device,
                    DeviceType::Capture,
                    default_input_name.as_deref(),
                ) {
                    devices.push(audio_device);
                }
            }
        }

        if let Ok(output_devices) = host.output_devices() {
            for device in output_devices {
                if let Ok(audio_device) = Self::from_cpal_device(
                    &device,
                    DeviceType::Playback,
                    default_output_name.as_deref(),
                ) {
                    devices.push(audio_device);
                }
            }
        }

        if devices.is_empty() {
            return Err(EngineError::NoDevicesFound);
        }

        Ok(devices)
    }

    /// Get only capture devices
    pub fn enumerate_inputs() -> EngineResult<Vec<AudioDevice>> {
        Ok(Self::enumerate_all()?
            .into_iter()
            .filter(|d| d.device_type == DeviceType::Capture)
            .collect())
    }

    /// Get only playback devices
    pub fn enumerate_outputs() -> EngineResult<Vec<AudioDevice>> {
        Ok(Self::enumerate_all()?
            .into_iter()
            .filter(|d| d.device_type == DeviceType::Playback)
            .collect())
    }

    /// Get the default capture device
    pub fn default_input() -> EngineResult<AudioDevice> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(EngineError::NoDevicesFound)?;

        Self::from_cpal_device(&device, DeviceType::Capture, None).map(|mut d| {
            d.is_default = true;
            d
        })
    }

    /// Get the default playback device
    pub fn default_output() -> EngineResult<AudioDevice> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(EngineError::NoDevicesFound)?;

        Self::from_cpal_device(&device, DeviceType::Playback, None).map(|mut d| {
            d.is_default = true;
            d
        })
    }

    fn from_cpal_device(
        device: &cpal::Device,
        device_type: DeviceType,
        default_name: Option<&str>,
    ) -> EngineResult<Self> {
        let name = device
            .name()
            .map_err(|e| EngineError::DeviceNotFound(e.to_string()))?;

        let is_default = default_name.map(|d| d == name).unwrap_or(false);

        let (sample_rates, max_channels) = match device_type {
            DeviceType::Capture => device
                .supported_input_configs()
                .map(Self::extract_config_info)
                .unwrap_or_else(|_| (vec![], 2)),
            DeviceType::Playback => device
                .supported_output_configs()
                .map(Self::extract_config_info)
                .unwrap_or_else(|_| (vec![], 2)),
        };

        Ok(AudioDevice {
            name,
            device_type,
            is_default,
            sample_rates,
            max_channels,
        })
    }

    fn extract_config_info(
        configs: impl Iterator<Item = cpal::SupportedStreamConfigRange>,
    ) -> (Vec<u32>, u16) {
        let mut sample_rates = Vec::new();
        let mut max_channels = 0u16;

        // Common sample rates to check
        const COMMON_RATES: [u32; 6] = [22050, 44100, 48000, 88200, 96000, 192000];

        for config in configs {
            max_channels = max_channels.max(config.channels());

            let min = config.min_sample_rate().0;
            let max = config.max_sample_rate().0;

            for &rate in &COMMON_RATES {
                if rate >= min && rate <= max && !sample_rates.contains(&rate) {
                    sample_rates.push(rate);
                }
            }
        }

        sample_rates.sort_unstable();
        (sample_rates, max_channels)
    }
}

impl fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rates: Vec<String> = self.sample_rates.iter().map(u32::to_string).collect();
        write!(
            f,
            "[{}]{} {} (max {} ch, rates: {})",
            self.device_type,
            if self.is_default { " *" } else { "" },
            self.name,
            self.max_channels,
            if rates.is_empty() { "unknown".to_string() } else { rates.join(", ") }
        )
    }
}

/// Resolve a cpal device by name, or the host default when `name` is `None`
pub(crate) fn find_device(
    host: &cpal::Host,
    direction: DeviceType,
    name: Option<&str>,
) -> EngineResult<cpal::Device> {
    let open_error = |reason: String| EngineError::DeviceOpen { direction, reason };

    match name {
        None => match direction {
            DeviceType::Capture => host.default_input_device(),
            DeviceType::Playback => host.default_output_device(),
        }
        .ok_or_else(|| open_error("no default device".to_string())),
        Some(wanted) => {
            let mut devices = match direction {
                DeviceType::Capture => host.input_devices(),
                DeviceType::Playback => host.output_devices(),
            }
            .map_err(|e| open_error(e.to_string()))?;

            devices
                .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
                .ok_or_else(|| open_error(format!("no device named '{wanted}'")))
        }
    }
}
