//! Pulsar Visual - Animated Visual State
//!
//! This crate turns band intensities into something to look at:
//! - Bars whose heights chase their targets at a gap-proportional speed
//! - A particle field whose brightness follows the bass bars
//! - A shared max-intensity ceiling adjustable from the keyboard
//! - Scene composition onto any [`RenderSurface`]
//!
//! # Frame Flow
//!
//! ```text
//!   BandIntensity[N] ──▶ VisualStateMapper::update_visual_state(elapsed)
//!                                   │
//!                         bar_rects / particle_rects
//!                                   ▼
//!                      Scene::draw ──▶ RenderSurface ──▶ present
//!                                          │
//!                                     poll_keys ──▶ handle_keys
//! ```

mod bar;
mod color;
mod controls;
mod error;
mod intensity;
mod layout;
mod mapper;
mod particle;
mod scene;
mod smoothing;
mod surface;

pub use bar::{target_height, BarState, BAR_SMOOTHING, MIN_VISIBLE_HEIGHT};
pub use color::{bar_gradient, Rgb};
pub use controls::{handle_keys, ControlOutcome};
pub use error::{RenderSurfaceError, VisualError};
pub use intensity::{
    MaxIntensityReference, DEFAULT_MAX_INTENSITY, MAX_INTENSITY_FLOOR, MAX_INTENSITY_STEP,
};
pub use layout::{BarGeometry, Layout};
pub use mapper::{
    bass_bar_count, VisualConfig, VisualStateMapper, DEFAULT_BAR_COUNT, DEFAULT_PARTICLE_COUNT,
};
pub use particle::{
    brightness_for_bass, ParticleState, MAX_BRIGHTNESS, MIN_BRIGHTNESS, PARTICLE_SMOOTHING,
};
pub use scene::{format_frequency, Scene};
pub use smoothing::approach;
pub use surface::{DrawCommand, DrawRect, Key, RecordingSurface, RenderSurface, TextStyle};
