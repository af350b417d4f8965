//! Engine Error Types

use thiserror::Error;

use crate::device::DeviceType;

/// Failure of a single capture or playback transfer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PcmError {
    #[error("capture overrun - frames were dropped before they could be read")]
    Overrun,

    #[error("playback underrun - the device ran out of frames")]
    Underrun,

    #[error("device disconnected: {0}")]
    Disconnected(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl PcmError {
    /// Overrun/underrun: the device can be re-prepared
    pub fn is_xrun(&self) -> bool {
        matches!(self, PcmError::Overrun | PcmError::Underrun)
    }
}

/// Errors that can occur in the audio engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unable to open {direction} device: {reason}")]
    DeviceOpen { direction: DeviceType, reason: String },

    #[error("Unable to negotiate {direction} hardware parameters: {reason}")]
    ParameterNegotiation { direction: DeviceType, reason: String },

    #[error("Device I/O error: {0}")]
    DeviceIo(#[from] PcmError),

    #[error("No audio devices found")]
    NoDevicesFound,

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Stream configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to spawn audio thread: {0}")]
    ThreadSpawn(String),

    #[error("Audio thread exited before reporting its state")]
    ThreadLost,

    #[error("Engine is closed")]
    Closed,

    #[error("DSP error: {0}")]
    DspError(#[from] pulsar_dsp::DspError),
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
