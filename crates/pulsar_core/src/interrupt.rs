//! Process-wide interrupt flag
//!
//! One flag shared by the audio thread and the presentation loop. Set by a
//! quit key, by fatal device errors, or by the audio thread failing to
//! open its devices. Never cleared once set; a fresh flag is created at
//! process start.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable handle to the shared interrupt flag
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    flag: Arc<AtomicBool>,
}

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an orderly stop of every loop polling this flag
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
