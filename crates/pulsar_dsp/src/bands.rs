//! Logarithmic Frequency Bands
//!
//! One band per visual bar, spaced geometrically between the lowest and
//! highest analyzed frequency so each bar covers the same musical interval.

use crate::error::DspError;

/// Default number of bands (one per bar)
pub const DEFAULT_BAND_COUNT: usize = 20;

/// Lowest analyzed frequency in Hz
pub const DEFAULT_MIN_FREQ: f32 = 20.0;

/// Highest analyzed frequency in Hz
pub const DEFAULT_MAX_FREQ: f32 = 20000.0;

/// A contiguous frequency range aggregated into one intensity value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyBand {
    pub lower_freq: f32,
    pub upper_freq: f32,
}

impl FrequencyBand {
    /// Whether `freq` falls inside this band (lower inclusive, upper exclusive)
    pub fn contains(&self, freq: f32) -> bool {
        freq >= self.lower_freq && freq < self.upper_freq
    }

    /// Geometric centre of the band
    pub fn center(&self) -> f32 {
        (self.lower_freq * self.upper_freq).sqrt()
    }
}

/// Generate `count` contiguous bands between `start_freq` and `end_freq`
///
/// Edge `i` sits at `start * (end / start)^(i / count)`. Neighbouring bands
/// compute their shared edge with the same expression, so `band[i].upper`
/// and `band[i + 1].lower` are bit-identical.
pub fn generate_frequency_bands(
    count: usize,
    start_freq: f32,
    end_freq: f32,
) -> Result<Vec<FrequencyBand>, DspError> {
    if count == 0 {
        return Err(DspError::InvalidBandCount(count));
    }
    if !(start_freq > 0.0 && end_freq > start_freq) {
        return Err(DspError::InvalidFrequencyRange {
            start: start_freq,
            end: end_freq,
        });
    }

    let ratio = end_freq / start_freq;
    let edge = |i: usize| start_freq * ratio.powf(i as f32 / count as f32);

    Ok((0..count)
        .map(|i| FrequencyBand {
            lower_freq: edge(i),
            upper_freq: edge(i + 1),
        })
        .collect())
}
