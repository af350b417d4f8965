//! Visual State Mapper
//!
//! Turns per-band intensities into animated bars and a particle field,
//! once per rendered frame.
//!
//! # Update Order
//!
//! ```text
//! intensities ──▶ bar targets ──▶ bass proxy ──▶ particles
//!                      │
//!                      └────────────────────────▶ bar heights
//! ```
//!
//! Particles read the fresh targets, not the smoothed heights, so the
//! field reacts to a kick drum before the bars finish rising.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::bar::BarState;
use crate::color::bar_gradient;
use crate::error::VisualError;
use crate::intensity::MaxIntensityReference;
use crate::layout::Layout;
use crate::particle::ParticleState;
use crate::surface::DrawRect;

/// Share of the lowest bars that make up the bass proxy
const BASS_FRACTION: f64 = 0.33;

pub const DEFAULT_PARTICLE_COUNT: usize = 1000;
pub const DEFAULT_BAR_COUNT: usize = 20;

/// Fixed sizes of the visual state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualConfig {
    pub layout: Layout,
    pub bar_count: usize,
    pub particle_count: usize,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            layout: Layout::default(),
            bar_count: DEFAULT_BAR_COUNT,
            particle_count: DEFAULT_PARTICLE_COUNT,
        }
    }
}

pub struct VisualStateMapper {
    layout: Layout,
    bars: Vec<BarState>,
    particles: Vec<ParticleState>,
    max_intensity: MaxIntensityReference,
    rng: StdRng,
}

impl VisualStateMapper {
    pub fn new(
        config: VisualConfig,
        max_intensity: MaxIntensityReference,
        mut rng: StdRng,
    ) -> Result<Self, VisualError> {
        if config.bar_count == 0 {
            return Err(VisualError::InvalidBarCount(config.bar_count));
        }
        let layout = config.layout;

        let bars = (0..config.bar_count)
            .map(|i| {
                BarState::new(
                    layout.bar_geometry(i, config.bar_count),
                    bar_gradient(i, config.bar_count),
                )
            })
            .collect();

        let particles = (0..config.particle_count)
            .map(|_| ParticleState::spawn(&layout, &mut rng))
            .collect();

        debug!(
            bars = config.bar_count,
            particles = config.particle_count,
            "Visual state initialised"
        );

        Ok(Self {
            layout,
            bars,
            particles,
            max_intensity,
            rng,
        })
    }

    /// Deterministic particle placement
    pub fn with_seed(
        config: VisualConfig,
        max_intensity: MaxIntensityReference,
        seed: u64,
    ) -> Result<Self, VisualError> {
        Self::new(config, max_intensity, StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy(
        config: VisualConfig,
        max_intensity: MaxIntensityReference,
    ) -> Result<Self, VisualError> {
        Self::new(config, max_intensity, StdRng::from_entropy())
    }

    /// Advance every bar and particle by one frame
    ///
    /// `intensities` holds one value per bar; extra values are ignored and
    /// missing ones leave their bars' targets unchanged.
    pub fn update_visual_state(&mut self, intensities: &[f64], elapsed_ms: f64) {
        debug_assert_eq!(intensities.len(), self.bars.len());

        let reference = self.max_intensity.get() as f64;
        for (bar, &intensity) in self.bars.iter_mut().zip(intensities) {
            bar.set_intensity(intensity, reference);
        }

        let bass = self.bass_proxy();
        let Self {
            layout,
            particles,
            rng,
            ..
        } = self;
        for particle in particles.iter_mut() {
            particle.update(bass, elapsed_ms, layout, rng);
        }

        for bar in &mut self.bars {
            bar.update(elapsed_ms);
        }
    }

    /// Mean target height of the lowest third of the bars
    pub fn bass_proxy(&self) -> f64 {
        let count = bass_bar_count(self.bars.len());
        if count == 0 {
            return 0.0;
        }
        let sum: f64 = self.bars[..count].iter().map(BarState::target_height).sum();
        sum / count as f64
    }

    pub fn bars(&self) -> &[BarState] {
        &self.bars
    }

    pub fn particles(&self) -> &[ParticleState] {
        &self.particles
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn max_intensity(&self) -> &MaxIntensityReference {
        &self.max_intensity
    }

    pub fn bar_rects(&self) -> impl Iterator<Item = DrawRect> + '_ {
        self.bars.iter().map(BarState::rect)
    }

    pub fn particle_rects(&self) -> impl Iterator<Item = DrawRect> + '_ {
        self.particles.iter().map(ParticleState::rect)
    }
}

/// Number of bars averaged into the bass proxy, at least one
pub fn bass_bar_count(bar_count: usize) -> usize {
    ((bar_count as f64 * BASS_FRACTION) as usize)
        .max(1)
        .min(bar_count)
}
