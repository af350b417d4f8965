//! Frame-rate limiter

use std::thread;
use std::time::{Duration, Instant};

pub struct FrameLimiter {
    frame: Duration,
    last: Instant,
}

impl FrameLimiter {
    pub fn new(fps: u32) -> Self {
        Self {
            frame: Duration::from_micros(1_000_000 / fps.max(1) as u64),
            last: Instant::now(),
        }
    }

    /// Sleep out the rest of the frame; returns milliseconds since the previous call
    pub fn wait(&mut self) -> f64 {
        let deadline = self.last + self.frame;
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        }

        let now = Instant::now();
        let elapsed = now - self.last;
        self.last = now;
        elapsed.as_secs_f64() * 1000.0
    }
}
