//! Persistent Settings Management
//!
//! Operating parameters saved between runs. Command-line flags override
//! whatever is loaded here.
//!
//! # Storage Locations
//! - Linux: `~/.config/pulsar/settings.json`
//! - Windows: `%APPDATA%\pulsar\pulsar\config\settings.json`
//! - macOS: `~/Library/Application Support/com.pulsar.pulsar/settings.json`

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::{EngineConfig, StreamConfig};

/// Device and stream settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub channels: u16,
    /// Period length in milliseconds
    pub period_ms: u32,
    pub capture_device: Option<String>,
    pub playback_device: Option<String>,
    pub playback_prefill_periods: usize,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            period_ms: 50,
            capture_device: None,
            playback_device: None,
            playback_prefill_periods: 1,
        }
    }
}

/// Spectral analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub bar_count: usize,
    pub min_freq: f32,
    pub max_freq: f32,
    pub pre_emphasis: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            bar_count: 20,
            min_freq: 20.0,
            max_freq: 20000.0,
            pre_emphasis: 0.97,
        }
    }
}

/// Visualizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub target_fps: u32,
    pub particle_count: usize,
    pub max_intensity_default: u32,
    pub max_intensity_step: u32,
    pub max_intensity_floor: u32,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            target_fps: 60,
            particle_count: 1000,
            max_intensity_default: 600_000,
            max_intensity_step: 100_000,
            max_intensity_floor: 100_000,
        }
    }
}

/// Root settings structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PulsarSettings {
    #[serde(default)]
    pub audio: AudioSettings,
    #[serde(default)]
    pub analysis: AnalysisSettings,
    #[serde(default)]
    pub display: DisplaySettings,
}

impl PulsarSettings {
    /// Load settings from disk, or return default if missing/corrupt
    pub fn load() -> Self {
        match Self::get_config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                info!("Using default settings");
                Self::default()
            }
        }
    }

    /// Load from an explicit path, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::File::open(path) {
                Ok(file) => match serde_json::from_reader(file) {
                    Ok(settings) => {
                        info!("Settings loaded from {:?}", path);
                        return settings;
                    }
                    Err(e) => {
                        error!("Failed to parse settings file: {}", e);
                    }
                },
                Err(e) => {
                    error!("Failed to open settings file: {}", e);
                }
            }
        }

        info!("Using default settings");
        Self::default()
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<PathBuf, String> {
        let path = Self::get_config_path().ok_or("Could not determine config path")?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save to an explicit path, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let file = fs::File::create(path).map_err(|e| e.to_string())?;
        serde_json::to_writer_pretty(file, self).map_err(|e| e.to_string())?;

        info!("Settings saved to {:?}", path);
        Ok(())
    }

    /// Requested engine parameters
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            stream: StreamConfig::from_period_ms(
                self.audio.sample_rate,
                self.audio.channels,
                self.audio.period_ms,
            ),
            playback_prefill_periods: self.audio.playback_prefill_periods,
            ..EngineConfig::default()
        }
        .with_devices(
            self.audio.capture_device.clone(),
            self.audio.playback_device.clone(),
        )
    }

    /// Get the platform-specific configuration file path
    pub fn get_config_path() -> Option<PathBuf> {
        project_dirs().map(|proj| proj.config_dir().join("settings.json"))
    }

    /// Default log file location
    pub fn default_log_path() -> Option<PathBuf> {
        project_dirs().map(|proj| proj.data_local_dir().join("pulsar.log"))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "pulsar", "pulsar")
}
