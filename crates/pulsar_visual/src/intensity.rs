//! Max-Intensity Reference
//!
//! The normalisation ceiling that maps raw band energy onto bar height.
//! Shared between the key handler and the mapper; clones observe the same
//! value.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

pub const DEFAULT_MAX_INTENSITY: u32 = 600_000;
pub const MAX_INTENSITY_STEP: u32 = 100_000;
pub const MAX_INTENSITY_FLOOR: u32 = 100_000;

/// Shared, user-adjustable normalisation ceiling
#[derive(Debug, Clone)]
pub struct MaxIntensityReference {
    value: Arc<AtomicU32>,
    default: u32,
    step: u32,
    floor: u32,
}

impl Default for MaxIntensityReference {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INTENSITY, MAX_INTENSITY_STEP, MAX_INTENSITY_FLOOR)
    }
}

impl MaxIntensityReference {
    /// A floor of zero is raised to one so the reference can always divide
    pub fn new(default: u32, step: u32, floor: u32) -> Self {
        let floor = floor.max(1);
        let default = default.max(floor);
        Self {
            value: Arc::new(AtomicU32::new(default)),
            default,
            step,
            floor,
        }
    }

    pub fn get(&self) -> u32 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn increase(&self) -> u32 {
        self.apply(|v| v.saturating_add(self.step))
    }

    pub fn decrease(&self) -> u32 {
        self.apply(|v| v.saturating_sub(self.step).max(self.floor))
    }

    pub fn reset(&self) -> u32 {
        self.value.store(self.default, Ordering::Relaxed);
        self.default
    }

    pub fn floor(&self) -> u32 {
        self.floor
    }

    /// Returns the new value
    fn apply(&self, f: impl Fn(u32) -> u32) -> u32 {
        let previous = self
            .value
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(f(v)))
            .unwrap_or_else(|v| v);
        f(previous)
    }
}
