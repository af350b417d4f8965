//! Pulsar DSP - Spectral Analysis Module
//!
//! This crate provides the analysis stage of the Pulsar pipeline:
//! - Single-slot shared buffer handing the latest captured period to the analyzer
//! - Logarithmically spaced frequency bands, one per visual bar
//! - Pre-emphasis filtering of the mono downmix
//! - FFT magnitude binning with a rising high-frequency scale curve
//!
//! # Architecture
//!
//! ```text
//!   AudioEngine ──publish──▶ SharedAudioBuffer ──lock: downmix + pre-emphasis──▶ mono
//!                                                                                 │
//!                              BandIntensity[N] ◀── bin_intensities ◀── FFT ◀────┘
//! ```
//!
//! The FFT and binning run on the analyzer's own buffers, so the capture
//! thread only ever waits for a period-sized memcpy.

mod bands;
mod buffer;
mod context;
mod emphasis;
mod error;
mod fft;

pub use bands::{
    generate_frequency_bands, FrequencyBand, DEFAULT_BAND_COUNT, DEFAULT_MAX_FREQ,
    DEFAULT_MIN_FREQ,
};
pub use buffer::SharedAudioBuffer;
pub use context::AnalysisContext;
pub use emphasis::{apply_pre_emphasis, PRE_EMPHASIS_ALPHA};
pub use error::DspError;
pub use fft::{bin_intensities, BandIntensity, SpectralAnalyzer};

/// Complex sample type produced by [`SpectralAnalyzer::transform`]
pub use rustfft::num_complex::Complex;
