//! Particle Field
//!
//! Particles drift from their depth toward the viewer and fan out from the
//! canvas centre. Their brightness follows the bass energy. Once a particle
//! leaves the canvas it is respawned somewhere inside the visualizer box.

use rand::Rng;

use crate::color::Rgb;
use crate::layout::Layout;
use crate::smoothing::approach;
use crate::surface::DrawRect;

/// Brightness approach rate per millisecond, proportional to the gap
pub const PARTICLE_SMOOTHING: f64 = 0.010;

pub const MIN_BRIGHTNESS: f64 = 50.0;
pub const MAX_BRIGHTNESS: f64 = 255.0;

/// Side length of a drawn particle
pub const PARTICLE_SIZE: u32 = 2;

const INITIAL_BRIGHTNESS: f64 = 100.0;

/// Map the bass proxy from [0, 50] onto [20, 255]
///
/// Both the proxy and the result are truncated to whole steps.
pub fn brightness_for_bass(bass: f64) -> f64 {
    (bass.trunc() / 50.0 * (255.0 - 20.0) + 20.0)
        .clamp(0.0, 255.0)
        .trunc()
}

fn random_depth<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(3..=5) as f64
}

/// One particle of the background field
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleState {
    x: f64,
    y: f64,
    z: f64,
    target_brightness: f64,
    current_brightness: f64,
    color: Rgb,
}

impl ParticleState {
    /// Place a particle anywhere on the canvas
    pub fn spawn<R: Rng + ?Sized>(layout: &Layout, rng: &mut R) -> Self {
        Self {
            x: rng.gen_range(0..layout.width.max(1)) as f64,
            y: rng.gen_range(0..layout.height.max(1)) as f64,
            z: random_depth(rng),
            target_brightness: INITIAL_BRIGHTNESS,
            current_brightness: INITIAL_BRIGHTNESS,
            color: Rgb::WHITE,
        }
    }

    /// Particle at a fixed position, brightness at its starting value
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            target_brightness: INITIAL_BRIGHTNESS,
            current_brightness: INITIAL_BRIGHTNESS,
            color: Rgb::WHITE,
        }
    }

    /// Move back inside the visualizer box at a fresh depth
    pub fn respawn<R: Rng + ?Sized>(&mut self, layout: &Layout, rng: &mut R) {
        let (origin_x, origin_y) = layout.visualizer_origin();
        self.x = (origin_x + rng.gen_range(0..layout.visualizer_width.max(1)) as i32) as f64;
        self.y = (origin_y + rng.gen_range(0..layout.visualizer_height.max(1)) as i32) as f64;
        self.z = random_depth(rng);
    }

    pub fn position(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }

    pub fn target_brightness(&self) -> f64 {
        self.target_brightness
    }

    pub fn current_brightness(&self) -> f64 {
        self.current_brightness
    }

    /// Advance by one frame; returns true when the particle was respawned
    ///
    /// A particle that has reached depth zero has no parallax left and is
    /// respawned on its next update.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        bass: f64,
        elapsed_ms: f64,
        layout: &Layout,
        rng: &mut R,
    ) -> bool {
        if !layout.contains(self.x, self.y) || self.z <= 0.0 {
            self.respawn(layout, rng);
            return true;
        }

        self.target_brightness = brightness_for_bass(bass);
        self.current_brightness = approach(
            self.current_brightness,
            self.target_brightness,
            PARTICLE_SMOOTHING,
            elapsed_ms,
        )
        .clamp(MIN_BRIGHTNESS, MAX_BRIGHTNESS);

        // Between elapsed/23857 (dim) and elapsed/3533 (bright)
        let speed = elapsed_ms.max(0.0) / (25000.0 - self.current_brightness.powf(1.8));

        self.z = (self.z - speed).max(0.0);
        if self.z > 0.0 {
            let (cx, cy) = layout.center();
            self.x += (self.x - cx) * (speed / self.z);
            self.y += (self.y - cy) * (speed / self.z);
        }

        false
    }

    /// Fade-in factor from depth, in [1, 200]
    pub fn render_alpha(&self) -> f64 {
        (200.0 - (self.z / 2.0) * 200.0).clamp(1.0, 200.0)
    }

    /// Depth-derived brightness, in [0, 255]
    pub fn render_brightness(&self) -> f64 {
        let alpha = self.render_alpha();
        (alpha + (alpha / 200.0) * 255.0).clamp(0.0, 255.0)
    }

    /// Colour blended against a black background
    pub fn render_color(&self) -> Rgb {
        let factor = (self.current_brightness / 255.0) * (self.render_brightness() / 255.0);
        self.color.scaled(factor)
    }

    pub fn rect(&self) -> DrawRect {
        DrawRect::filled(
            self.x as i32,
            self.y as i32,
            PARTICLE_SIZE,
            PARTICLE_SIZE,
            self.render_color(),
        )
    }
}
