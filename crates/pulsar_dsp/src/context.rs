//! Analysis Context
//!
//! Stream metadata the analysis stage is sized from. Built once from the
//! negotiated device parameters, never from the requested ones.

use crate::error::DspError;

/// Context describing the period the analyzer consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisContext {
    pub sample_rate: u32,
    pub channels: usize,
    pub frames_per_period: usize,
}

impl AnalysisContext {
    pub fn new(
        sample_rate: u32,
        channels: usize,
        frames_per_period: usize,
    ) -> Result<Self, DspError> {
        if sample_rate == 0 {
            return Err(DspError::InvalidSampleRate(sample_rate));
        }
        if channels == 0 || frames_per_period == 0 {
            return Err(DspError::InvalidPeriod {
                frames: frames_per_period,
                channels,
            });
        }

        Ok(Self {
            sample_rate,
            channels,
            frames_per_period,
        })
    }

    /// Interleaved samples in one period
    #[inline]
    pub fn samples_per_period(&self) -> usize {
        self.frames_per_period * self.channels
    }

    /// Width of one FFT bin in Hz
    #[inline]
    pub fn freq_resolution(&self) -> f64 {
        self.sample_rate as f64 / self.frames_per_period as f64
    }

    /// Highest usable bin index
    #[inline]
    pub fn nyquist_bin(&self) -> usize {
        self.frames_per_period / 2
    }
}
