//! Shared Audio Buffer
//!
//! Single-slot handoff between the capture thread (sole writer) and the
//! presentation thread (sole reader). The writer replaces a whole period
//! under the lock, so the reader always sees one complete period: either
//! the previous one or the latest one, never a mix.
//!
//! ```text
//!   capture thread                      presentation thread
//!   read_period ──publish()──▶ [ Mutex<period> ] ──with_period()──▶ pre-emphasis
//!                  (memcpy)                          (copy + filter)
//! ```
//!
//! Both sides hold the lock for O(period) memory work only; the FFT runs on
//! the reader's private copy.

use parking_lot::Mutex;

use crate::error::DspError;

/// Latest complete period of interleaved i16 samples
#[derive(Debug)]
pub struct SharedAudioBuffer {
    samples: Mutex<Vec<i16>>,
    frames: usize,
    channels: usize,
}

impl SharedAudioBuffer {
    /// Create a silent buffer holding one period
    pub fn new(frames_per_period: usize, channels: usize) -> Result<Self, DspError> {
        if frames_per_period == 0 || channels == 0 {
            return Err(DspError::InvalidPeriod {
                frames: frames_per_period,
                channels,
            });
        }

        Ok(Self {
            samples: Mutex::new(vec![0; frames_per_period * channels]),
            frames: frames_per_period,
            channels,
        })
    }

    /// Total interleaved sample count (constant for the buffer's lifetime)
    #[inline]
    pub fn len(&self) -> usize {
        self.frames * self.channels
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Replace the stored period with `period`
    ///
    /// Only complete periods are accepted; anything else is rejected
    /// without touching the stored data.
    pub fn publish(&self, period: &[i16]) -> Result<(), DspError> {
        if period.len() != self.len() {
            return Err(DspError::BufferSizeMismatch {
                expected: self.len(),
                got: period.len(),
            });
        }

        self.samples.lock().copy_from_slice(period);
        Ok(())
    }

    /// Run `f` on the stored period while holding the lock
    ///
    /// Keep `f` to copy-sized work. The capture thread blocks on this lock.
    pub fn with_period<R>(&self, f: impl FnOnce(&[i16]) -> R) -> R {
        let guard = self.samples.lock();
        f(&guard)
    }

    /// Copy of the stored period
    pub fn snapshot(&self) -> Vec<i16> {
        self.samples.lock().clone()
    }
}
