//! Frequency Bars

use crate::color::Rgb;
use crate::layout::BarGeometry;
use crate::smoothing::approach;
use crate::surface::DrawRect;

/// Bars never shrink below this, so silent bands stay visible
pub const MIN_VISIBLE_HEIGHT: f64 = 2.0;

/// Height approach rate per millisecond, proportional to the gap
pub const BAR_SMOOTHING: f64 = 0.020;

/// Height a bar should reach for `intensity` under the current ceiling
///
/// Intensities at or above `max_intensity` saturate at `max_height`.
pub fn target_height(intensity: f64, max_intensity: f64, max_height: f64) -> f64 {
    if max_intensity <= 0.0 || !intensity.is_finite() {
        return 0.0;
    }
    ((intensity / max_intensity).clamp(0.0, 1.0) * max_height).round()
}

/// One animated frequency bar
#[derive(Debug, Clone, PartialEq)]
pub struct BarState {
    geometry: BarGeometry,
    color: Rgb,
    height: f64,
    target_height: f64,
    time_since_update: f64,
}

impl BarState {
    pub fn new(geometry: BarGeometry, color: Rgb) -> Self {
        Self {
            geometry,
            color,
            height: 0.0,
            target_height: 0.0,
            time_since_update: 0.0,
        }
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn target_height(&self) -> f64 {
        self.target_height
    }

    pub fn max_height(&self) -> f64 {
        self.geometry.max_height
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    /// Milliseconds since the target last changed
    pub fn time_since_update(&self) -> f64 {
        self.time_since_update
    }

    /// Set the target from a band intensity
    pub fn set_intensity(&mut self, intensity: f64, max_intensity: f64) {
        self.set_target(target_height(intensity, max_intensity, self.geometry.max_height));
    }

    pub fn set_target(&mut self, target: f64) {
        let target = target.clamp(0.0, self.geometry.max_height);
        if target != self.target_height {
            self.target_height = target;
            self.time_since_update = 0.0;
        }
    }

    /// Advance by one frame of `elapsed_ms`
    pub fn update(&mut self, elapsed_ms: f64) {
        self.time_since_update += elapsed_ms.max(0.0);
        self.height = approach(self.height, self.target_height, BAR_SMOOTHING, elapsed_ms)
            .clamp(MIN_VISIBLE_HEIGHT, self.geometry.max_height.max(MIN_VISIBLE_HEIGHT));
    }

    /// Rectangle centred on the bar's vertical centre line
    pub fn rect(&self) -> DrawRect {
        let height = self.height.round() as i32;
        DrawRect::filled(
            self.geometry.x,
            self.geometry.y - height / 2,
            self.geometry.width,
            height.max(0) as u32,
            self.color,
        )
    }
}
