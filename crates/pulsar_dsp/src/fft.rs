//! Spectral Analyzer
//!
//! Turns the latest captured period into one intensity per frequency band:
//!
//! 1. downmix + pre-emphasis, under the shared buffer lock
//! 2. forward FFT of length `frames_per_period`, lock-free
//! 3. magnitude binning into logarithmic bands with a rising scale curve
//!
//! No window is applied. The rectangular window leaks energy into
//! neighbouring bins for tones that are not bin-centred; the intensities
//! are tuned against that behaviour.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use tracing::debug;

use crate::bands::FrequencyBand;
use crate::buffer::SharedAudioBuffer;
use crate::context::AnalysisContext;
use crate::emphasis::{apply_pre_emphasis, PRE_EMPHASIS_ALPHA};
use crate::error::DspError;

/// Per-band energy, recomputed on every analysis call
pub type BandIntensity = f64;

/// Computes band intensities from one period of interleaved audio
pub struct SpectralAnalyzer {
    context: AnalysisContext,
    bands: Vec<FrequencyBand>,
    alpha: f64,
    /// FFT plan (reused for every period)
    fft: Arc<dyn Fft<f64>>,
    /// Filtered mono samples of the current period
    mono: Vec<f64>,
    /// In-place FFT buffer
    spectrum: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl SpectralAnalyzer {
    /// Create an analyzer for `context`, binning into `bands`
    pub fn new(context: AnalysisContext, bands: Vec<FrequencyBand>) -> Result<Self, DspError> {
        if bands.is_empty() {
            return Err(DspError::InvalidBandCount(0));
        }

        let frames = context.frames_per_period;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(frames);
        let scratch_len = fft.get_inplace_scratch_len();

        debug!(
            "Spectral analyzer planned: {} frames, {} bands, {:.2}Hz per bin",
            frames,
            bands.len(),
            context.freq_resolution()
        );

        Ok(Self {
            context,
            bands,
            alpha: PRE_EMPHASIS_ALPHA,
            fft,
            mono: Vec::with_capacity(frames),
            spectrum: vec![Complex::new(0.0, 0.0); frames],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        })
    }

    /// Override the pre-emphasis coefficient
    pub fn with_pre_emphasis(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn context(&self) -> &AnalysisContext {
        &self.context
    }

    pub fn bands(&self) -> &[FrequencyBand] {
        &self.bands
    }

    /// Analyze the latest complete period held by `buffer`
    ///
    /// The lock is held only while the period is downmixed and filtered.
    pub fn compute_spectrum(&mut self, buffer: &SharedAudioBuffer) -> Vec<BandIntensity> {
        debug_assert_eq!(buffer.frames(), self.context.frames_per_period);
        debug_assert_eq!(buffer.channels(), self.context.channels);

        let channels = self.context.channels;
        let alpha = self.alpha;
        let mono = &mut self.mono;
        buffer.with_period(|period| apply_pre_emphasis(period, channels, alpha, mono));

        self.analyze_filtered()
    }

    /// Analyze a caller-owned period of interleaved samples
    pub fn analyze_period(&mut self, period: &[i16]) -> Result<Vec<BandIntensity>, DspError> {
        let expected = self.context.samples_per_period();
        if period.len() != expected {
            return Err(DspError::BufferSizeMismatch {
                expected,
                got: period.len(),
            });
        }

        apply_pre_emphasis(period, self.context.channels, self.alpha, &mut self.mono);
        Ok(self.analyze_filtered())
    }

    /// Forward transform of one filtered mono period
    pub fn transform(&mut self, mono: &[f64]) -> Vec<Complex<f64>> {
        self.load(mono);
        self.fft
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);
        self.spectrum.clone()
    }

    fn analyze_filtered(&mut self) -> Vec<BandIntensity> {
        let Self {
            mono,
            spectrum,
            scratch,
            fft,
            ..
        } = self;
        for (slot, &sample) in spectrum.iter_mut().zip(mono.iter()) {
            *slot = Complex::new(sample, 0.0);
        }
        fft.process_with_scratch(spectrum, scratch);

        bin_intensities(&self.spectrum, &self.bands, &self.context)
    }

    fn load(&mut self, mono: &[f64]) {
        debug_assert_eq!(mono.len(), self.spectrum.len());
        for (slot, &sample) in self.spectrum.iter_mut().zip(mono.iter()) {
            *slot = Complex::new(sample, 0.0);
        }
    }
}

/// Aggregate FFT magnitudes into per-band intensities
///
/// For band `i`: bins `[floor(lo / res), min(floor(hi / res), N / 2)]`
/// inclusive are summed. The sum is divided by `end - start` only when that
/// is positive, so a band collapsed onto a single bin stays unnormalized.
/// The result is scaled by `1 + i / 10`.
pub fn bin_intensities(
    spectrum: &[Complex<f64>],
    bands: &[FrequencyBand],
    context: &AnalysisContext,
) -> Vec<BandIntensity> {
    let freq_resolution = context.freq_resolution();
    let nyquist = context.nyquist_bin().min(spectrum.len().saturating_sub(1));

    bands
        .iter()
        .enumerate()
        .map(|(index, band)| {
            let start = (band.lower_freq as f64 / freq_resolution) as usize;
            let end = ((band.upper_freq as f64 / freq_resolution) as usize).min(nyquist);

            let mut sum: f64 = if start <= end {
                spectrum[start..=end].iter().map(|c| c.norm()).sum()
            } else {
                0.0
            };
            if end > start {
                sum /= (end - start) as f64;
            }

            sum * (1.0 + index as f64 / 10.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bands::generate_frequency_bands;
    use std::f64::consts::PI;

    fn default_analyzer() -> SpectralAnalyzer {
        let context = AnalysisContext::new(44100, 2, 2205).unwrap();
        let bands = generate_frequency_bands(20, 20.0, 20000.0).unwrap();
        SpectralAnalyzer::new(context, bands).unwrap()
    }

    fn stereo_sine(freq: f64, amplitude: f64, frames: usize, sample_rate: f64) -> Vec<i16> {
        (0..frames)
            .flat_map(|n| {
                let s = (amplitude * (2.0 * PI * freq * n as f64 / sample_rate).sin()) as i16;
                [s, s]
            })
            .collect()
    }

    fn loudest_band(intensities: &[f64]) -> usize {
        intensities
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap()
    }

    #[test]
    fn test_silence_gives_zero_intensities() {
        let mut analyzer = default_analyzer();
        let buffer = SharedAudioBuffer::new(2205, 2).unwrap();

        let intensities = analyzer.compute_spectrum(&buffer);
        assert_eq!(intensities.len(), 20);
        assert!(intensities.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_full_scale_1khz_peaks_in_its_band() {
        let mut analyzer = default_analyzer();
        let buffer = SharedAudioBuffer::new(2205, 2).unwrap();
        buffer
            .publish(&stereo_sine(1000.0, 32767.0, 2205, 44100.0))
            .unwrap();

        let intensities = analyzer.compute_spectrum(&buffer);
        let expected = analyzer
            .bands()
            .iter()
            .position(|b| b.contains(1000.0))
            .unwrap();

        assert_eq!(loudest_band(&intensities), expected);
        for (i, &value) in intensities.iter().enumerate() {
            if i != expected {
                assert!(intensities[expected] > value, "band {i} rivals the tone band");
            }
        }
    }

    #[test]
    fn test_tone_centred_in_band_wins() {
        let mut analyzer = default_analyzer();
        // Centre of band 15 (~4.2kHz) rounded onto a bin
        let centre = analyzer.bands()[15].center() as f64;
        let freq = (centre / 20.0).round() * 20.0;
        let period = stereo_sine(freq, 16000.0, 2205, 44100.0);

        let intensities = analyzer.analyze_period(&period).unwrap();
        assert_eq!(loudest_band(&intensities), 15);
    }

    #[test]
    fn test_shared_and_owned_paths_agree() {
        let mut analyzer = default_analyzer();
        let period = stereo_sine(440.0, 12000.0, 2205, 44100.0);
        let buffer = SharedAudioBuffer::new(2205, 2).unwrap();
        buffer.publish(&period).unwrap();

        let from_buffer = analyzer.compute_spectrum(&buffer);
        let from_slice = analyzer.analyze_period(&period).unwrap();
        assert_eq!(from_buffer, from_slice);
    }

    #[test]
    fn test_analyze_rejects_wrong_length() {
        let mut analyzer = default_analyzer();
        let err = analyzer.analyze_period(&[0; 100]).unwrap_err();
        assert_eq!(
            err,
            DspError::BufferSizeMismatch {
                expected: 4410,
                got: 100
            }
        );
    }

    #[test]
    fn test_transform_of_impulse_is_flat() {
        let mut analyzer = default_analyzer();
        let mut mono = vec![0.0; 2205];
        mono[0] = 1.0;

        let spectrum = analyzer.transform(&mono);
        assert_eq!(spectrum.len(), 2205);
        for bin in &spectrum {
            assert!((bin.norm() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_binning_scale_curve() {
        // Flat unit spectrum: every band averages to (count / (count - 1))
        // before scaling, so the scale factor is recoverable.
        let context = AnalysisContext::new(44100, 2, 2205).unwrap();
        let spectrum = vec![Complex::new(1.0, 0.0); 2205];
        let bands = vec![
            FrequencyBand {
                lower_freq: 100.0,
                upper_freq: 200.0,
            },
            FrequencyBand {
                lower_freq: 100.0,
                upper_freq: 200.0,
            },
        ];

        let intensities = bin_intensities(&spectrum, &bands, &context);
        // bins 5..=10: six magnitudes over a span of five
        assert!((intensities[0] - 6.0 / 5.0).abs() < 1e-12);
        assert!((intensities[1] - 6.0 / 5.0 * 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_nyquist_clamped_band_left_unnormalized() {
        // Both edges land above Nyquist (1102 at 20Hz per bin): start 1150,
        // end clamped to 1102, so the range is empty and nothing is divided.
        // A band whose start sits exactly on Nyquist collapses to one bin
        // and keeps its raw magnitude instead of being averaged.
        let context = AnalysisContext::new(44100, 2, 2205).unwrap();
        let spectrum = vec![Complex::new(3.0, 4.0); 2205];
        let bands = vec![
            FrequencyBand {
                lower_freq: 23000.0,
                upper_freq: 24000.0,
            },
            FrequencyBand {
                lower_freq: 22040.0,
                upper_freq: 23000.0,
            },
        ];

        let intensities = bin_intensities(&spectrum, &bands, &context);
        assert_eq!(intensities[0], 0.0);
        // start = floor(22040 / 20) = 1102 = end; single |3+4i| = 5, scaled 1.1
        assert!((intensities[1] - 5.0 * 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_pre_emphasis_override() {
        let context = AnalysisContext::new(44100, 1, 64).unwrap();
        let bands = generate_frequency_bands(4, 20.0, 20000.0).unwrap();
        let mut plain = SpectralAnalyzer::new(context, bands.clone())
            .unwrap()
            .with_pre_emphasis(0.0);
        let mut emphasized = SpectralAnalyzer::new(context, bands).unwrap();

        let period = vec![1000i16; 64];
        let flat = plain.analyze_period(&period).unwrap();
        let lifted = emphasized.analyze_period(&period).unwrap();
        // DC input: pre-emphasis removes most of the energy
        assert!(flat.iter().sum::<f64>() > lifted.iter().sum::<f64>());
    }
}
