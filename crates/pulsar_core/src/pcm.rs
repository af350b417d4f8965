//! Blocking PCM device interface
//!
//! The engine loop talks to its devices one period at a time. A transfer
//! blocks for up to about one period and returns the number of whole
//! frames moved; fewer than requested is a short transfer, not an error.
//!
//! The cpal-backed implementations live in `stream.rs`. This module also
//! carries a generated-signal capture device and a discarding playback
//! device for running without audio hardware.

use std::f64::consts::TAU;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::StreamConfig;
use crate::error::PcmError;

/// Source of captured periods
pub trait CaptureDevice {
    /// Read up to `buffer.len() / channels` frames; returns frames read
    fn read_period(&mut self, buffer: &mut [i16]) -> Result<usize, PcmError>;

    /// Recover from an overrun and leave the device ready to read again
    fn prepare(&mut self) -> Result<(), PcmError>;

    fn name(&self) -> &str;
}

/// Sink for played-back periods
pub trait PlaybackDevice {
    /// Write up to `buffer.len() / channels` frames; returns frames written
    fn write_period(&mut self, buffer: &[i16]) -> Result<usize, PcmError>;

    /// Recover from an underrun and leave the device ready to write again
    fn prepare(&mut self) -> Result<(), PcmError>;

    fn name(&self) -> &str;
}

/// Prepared capture/playback devices plus the parameters they accepted
pub struct PcmPair {
    pub capture: Box<dyn CaptureDevice>,
    pub playback: Box<dyn PlaybackDevice>,
    pub negotiated: StreamConfig,
}

impl PcmPair {
    /// A generated test tone captured and played into nothing
    pub fn synthetic(config: StreamConfig, tone_hz: f64, realtime: bool) -> Self {
        Self {
            capture: Box::new(SignalCapture::new(config, tone_hz, realtime)),
            playback: Box::new(DiscardPlayback::new(config.channels)),
            negotiated: config,
        }
    }
}

/// Capture device producing a slowly sweeping sine tone
///
/// With `realtime` set, each read sleeps until the period would have been
/// delivered by real hardware.
pub struct SignalCapture {
    config: StreamConfig,
    base_hz: f64,
    phase: f64,
    frames_generated: u64,
    realtime: bool,
    next_deadline: Option<Instant>,
}

impl SignalCapture {
    pub fn new(config: StreamConfig, base_hz: f64, realtime: bool) -> Self {
        Self {
            config,
            base_hz,
            phase: 0.0,
            frames_generated: 0,
            realtime,
            next_deadline: None,
        }
    }

    fn period_duration(&self) -> Duration {
        Duration::from_secs_f64(
            self.config.frames_per_period as f64 / self.config.sample_rate as f64,
        )
    }

    /// Tone frequency at the current position: one octave up and back every 8s
    fn current_hz(&self) -> f64 {
        let seconds = self.frames_generated as f64 / self.config.sample_rate as f64;
        let sweep = (seconds * TAU / 8.0).sin() * 0.5 + 0.5;
        self.base_hz * 2f64.powf(sweep)
    }
}

impl CaptureDevice for SignalCapture {
    fn read_period(&mut self, buffer: &mut [i16]) -> Result<usize, PcmError> {
        if self.realtime {
            let now = Instant::now();
            let deadline = self.next_deadline.unwrap_or(now);
            if deadline > now {
                thread::sleep(deadline - now);
            }
            self.next_deadline = Some(deadline.max(now) + self.period_duration());
        }

        let channels = self.config.channels as usize;
        let step = TAU * self.current_hz() / self.config.sample_rate as f64;
        let mut frames = 0;
        for frame in buffer.chunks_exact_mut(channels) {
            let sample = (self.phase.sin() * 16000.0) as i16;
            frame.fill(sample);
            self.phase = (self.phase + step) % TAU;
            frames += 1;
        }
        self.frames_generated += frames as u64;
        Ok(frames)
    }

    fn prepare(&mut self) -> Result<(), PcmError> {
        self.next_deadline = None;
        Ok(())
    }

    fn name(&self) -> &str {
        "signal generator"
    }
}

/// Playback device that accepts and drops every frame
pub struct DiscardPlayback {
    channels: usize,
}

impl DiscardPlayback {
    pub fn new(channels: u16) -> Self {
        Self {
            channels: channels.max(1) as usize,
        }
    }
}

impl PlaybackDevice for DiscardPlayback {
    fn write_period(&mut self, buffer: &[i16]) -> Result<usize, PcmError> {
        Ok(buffer.len() / self.channels)
    }

    fn prepare(&mut self) -> Result<(), PcmError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "discard"
    }
}
