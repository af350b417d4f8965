//! DSP Error Types

use thiserror::Error;

/// Errors that can occur while setting up or feeding the analysis stage
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DspError {
    #[error("Invalid band count: {0} (must be at least 1)")]
    InvalidBandCount(usize),

    #[error("Invalid frequency range {start}Hz..{end}Hz (need 0 < start < end)")]
    InvalidFrequencyRange { start: f32, end: f32 },

    #[error("Sample rate must be positive, got {0}")]
    InvalidSampleRate(u32),

    #[error("Invalid period: {frames} frames x {channels} channels")]
    InvalidPeriod { frames: usize, channels: usize },

    #[error("Buffer size mismatch: expected {expected}, got {got}")]
    BufferSizeMismatch { expected: usize, got: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DspError::InvalidBandCount(0);
        assert!(err.to_string().contains("at least 1"));

        let err = DspError::InvalidFrequencyRange {
            start: 20000.0,
            end: 20.0,
        };
        assert!(err.to_string().contains("20000"));

        let err = DspError::BufferSizeMismatch {
            expected: 4410,
            got: 4408,
        };
        assert!(err.to_string().contains("4410"));
        assert!(err.to_string().contains("4408"));
    }
}
