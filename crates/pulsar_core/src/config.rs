//! Engine and Stream Configuration

use serde::{Deserialize, Serialize};

/// Audio stream configuration
///
/// Holds either the requested parameters or, after negotiation, the values
/// the devices actually accepted. Downstream sizing always uses the latter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Sample rate in Hz (e.g., 44100, 48000)
    pub sample_rate: u32,

    /// Number of interleaved channels
    pub channels: u16,

    /// Frames exchanged with the devices per period (also the analysis size)
    pub frames_per_period: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            frames_per_period: 2205, // 50ms
        }
    }
}

impl StreamConfig {
    /// Build a config whose period lasts `period_ms` milliseconds
    pub fn from_period_ms(sample_rate: u32, channels: u16, period_ms: u32) -> Self {
        Self {
            sample_rate,
            channels,
            frames_per_period: (sample_rate as u64 * period_ms as u64 / 1000) as u32,
        }
    }

    /// Calculate period latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        (self.frames_per_period as f32 / self.sample_rate as f32) * 1000.0
    }

    /// Interleaved samples in one period
    pub fn samples_per_period(&self) -> usize {
        self.frames_per_period as usize * self.channels as usize
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate < 8000 || self.sample_rate > 192000 {
            return Err(format!("Invalid sample rate: {}", self.sample_rate));
        }
        if self.channels == 0 || self.channels > 8 {
            return Err(format!("Invalid channel count: {}", self.channels));
        }
        if self.frames_per_period < 32 || self.frames_per_period > 16384 {
            return Err(format!("Invalid period size: {}", self.frames_per_period));
        }
        Ok(())
    }
}

/// Overall engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Requested stream parameters
    pub stream: StreamConfig,

    /// Capture device name (`None` = host default input)
    pub capture_device: Option<String>,

    /// Playback device name (`None` = host default output)
    pub playback_device: Option<String>,

    /// Silent periods queued ahead of the first playback write
    pub playback_prefill_periods: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stream: StreamConfig::default(),
            capture_device: None,
            playback_device: None,
            playback_prefill_periods: 1,
        }
    }
}

impl EngineConfig {
    pub fn with_devices(mut self, capture: Option<String>, playback: Option<String>) -> Self {
        self.capture_device = capture;
        self.playback_device = playback;
        self
    }
}
