//! Callback-to-engine ring bridges
//!
//! Each cpal stream is split into a callback half, moved into the device
//! callback, and an engine half that performs blocking one-period transfers.
//! The two halves share an rtrb SPSC ring and a `StreamStatus`.
//!
//! ```text
//!   capture callback ──CaptureFeed──▶ rtrb ──▶ CaptureBridge::read ───┐
//!                                                                    │ engine loop
//!   playback callback ◀──PlaybackDrain── rtrb ◀── PlaybackBridge::write ◀┘
//! ```
//!
//! A capture block that does not fit in the ring is dropped and latches an
//! overrun. A playback callback that finds the ring short after the first
//! real write latches an underrun. Both are reported by the next transfer.

use std::iter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cpal::{FromSample, SizedSample};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use rtrb::{Consumer, Producer, RingBuffer};

use crate::error::PcmError;
use crate::message::Event;

/// Ring capacity for capture, in periods
const CAPTURE_RING_PERIODS: usize = 4;

/// Extra playback ring headroom beyond the prefill, in periods
const PLAYBACK_RING_HEADROOM: usize = 3;

/// State shared between a device callback and its engine-side half
#[derive(Default)]
pub(crate) struct StreamStatus {
    /// Latched overrun (capture) or underrun (playback)
    xrun: AtomicBool,
    /// Playback only: underruns count once real frames have been written
    armed: AtomicBool,
    /// Error reported by the backend's error callback
    failure: Mutex<Option<PcmError>>,
}

impl StreamStatus {
    fn take_failure(&self) -> Result<(), PcmError> {
        match self.failure.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Record a backend stream error for the next transfer
    pub(crate) fn report(&self, err: cpal::StreamError, events: &Sender<Event>) {
        let _ = events.try_send(Event::error(&err));
        let pcm_err = match err {
            cpal::StreamError::DeviceNotAvailable => PcmError::Disconnected(err.to_string()),
            other => PcmError::Backend(other.to_string()),
        };
        *self.failure.lock() = Some(pcm_err);
    }
}

/// Sleep slice while waiting for a transfer to complete
fn poll_interval(period: Duration) -> Duration {
    (period / 8).max(Duration::from_millis(1))
}

/// Build the two halves of a capture ring
pub(crate) fn capture_bridge(
    samples_per_period: usize,
    channels: usize,
    period: Duration,
) -> (CaptureFeed, CaptureBridge) {
    let (producer, consumer) = RingBuffer::new(samples_per_period * CAPTURE_RING_PERIODS);
    let status = Arc::new(StreamStatus::default());

    (
        CaptureFeed {
            producer,
            status: Arc::clone(&status),
        },
        CaptureBridge {
            consumer,
            status,
            channels: channels.max(1),
            period,
        },
    )
}

/// Callback half of a capture ring
pub(crate) struct CaptureFeed {
    producer: Producer<i16>,
    status: Arc<StreamStatus>,
}

impl CaptureFeed {
    pub(crate) fn status(&self) -> Arc<StreamStatus> {
        Arc::clone(&self.status)
    }

    /// Queue one callback block, converted to i16
    pub(crate) fn push<T>(&mut self, data: &[T])
    where
        T: SizedSample,
        i16: FromSample<T>,
    {
        // Real-time audio callback - NO allocations allowed here
        match self.producer.write_chunk_uninit(data.len()) {
            Ok(chunk) => {
                chunk.fill_from_iter(data.iter().map(|&s| s.to_sample::<i16>()));
            }
            Err(_) => {
                // Engine thread fell behind: drop this block
                self.status.xrun.store(true, Ordering::Release);
            }
        }
    }
}

/// Engine half of a capture ring
pub(crate) struct CaptureBridge {
    consumer: Consumer<i16>,
    status: Arc<StreamStatus>,
    channels: usize,
    period: Duration,
}

impl CaptureBridge {
    pub(crate) fn period(&self) -> Duration {
        self.period
    }

    /// Surface a backend failure without waiting
    pub(crate) fn check(&self) -> Result<(), PcmError> {
        self.status.take_failure()
    }

    /// Fill `buffer` with whole frames, waiting until `deadline` at most
    ///
    /// Returns the frame count, which is short when the deadline passed
    /// first. A latched overrun is returned before any data.
    pub(crate) fn read(
        &mut self,
        buffer: &mut [i16],
        deadline: Instant,
    ) -> Result<usize, PcmError> {
        let wanted = buffer.len() - buffer.len() % self.channels;
        loop {
            if self.status.xrun.swap(false, Ordering::AcqRel) {
                return Err(PcmError::Overrun);
            }
            self.status.take_failure()?;
            if self.consumer.slots() >= wanted || Instant::now() >= deadline {
                break;
            }
            thread::sleep(poll_interval(self.period));
        }

        let available = self.consumer.slots().min(wanted);
        let available = available - available % self.channels;
        let chunk = self
            .consumer
            .read_chunk(available)
            .map_err(|e| PcmError::Backend(e.to_string()))?;
        let (first, second) = chunk.as_slices();
        buffer[..first.len()].copy_from_slice(first);
        buffer[first.len()..first.len() + second.len()].copy_from_slice(second);
        chunk.commit_all();

        Ok(available / self.channels)
    }

    /// Drop stale samples and clear the overrun latch
    pub(crate) fn reset(&mut self) {
        let stale = self.consumer.slots();
        if let Ok(chunk) = self.consumer.read_chunk(stale) {
            chunk.commit_all();
        }
        self.status.xrun.store(false, Ordering::Release);
    }
}

/// Build the two halves of a playback ring
pub(crate) fn playback_bridge(
    samples_per_period: usize,
    channels: usize,
    period: Duration,
    prefill_periods: usize,
) -> (PlaybackDrain, PlaybackBridge) {
    let (producer, consumer) =
        RingBuffer::new(samples_per_period * (prefill_periods + PLAYBACK_RING_HEADROOM));
    let status = Arc::new(StreamStatus::default());

    (
        PlaybackDrain {
            consumer,
            status: Arc::clone(&status),
        },
        PlaybackBridge {
            producer,
            status,
            channels: channels.max(1),
            period,
            prefill_samples: samples_per_period * prefill_periods,
            primed: false,
        },
    )
}

/// Callback half of a playback ring
pub(crate) struct PlaybackDrain {
    consumer: Consumer<i16>,
    status: Arc<StreamStatus>,
}

impl PlaybackDrain {
    pub(crate) fn status(&self) -> Arc<StreamStatus> {
        Arc::clone(&self.status)
    }

    /// Fill one callback block, padding with silence
    pub(crate) fn pull<T>(&mut self, data: &mut [T])
    where
        T: SizedSample + FromSample<i16>,
    {
        // Real-time audio callback - NO allocations allowed here
        let to_read = self.consumer.slots().min(data.len());
        let mut filled = 0;
        if let Ok(chunk) = self.consumer.read_chunk(to_read) {
            for (out, sample) in data.iter_mut().zip(chunk) {
                *out = T::from_sample(sample);
                filled += 1;
            }
        }

        if filled < data.len() {
            data[filled..].fill(T::EQUILIBRIUM);
            if self.status.armed.load(Ordering::Acquire) {
                self.status.xrun.store(true, Ordering::Release);
            }
        }
    }
}

/// Engine half of a playback ring
pub(crate) struct PlaybackBridge {
    producer: Producer<i16>,
    status: Arc<StreamStatus>,
    channels: usize,
    period: Duration,
    prefill_samples: usize,
    /// Prefill queued since the last reset
    primed: bool,
}

impl PlaybackBridge {
    pub(crate) fn period(&self) -> Duration {
        self.period
    }

    /// Surface a latched underrun or backend failure
    pub(crate) fn check(&self) -> Result<(), PcmError> {
        if self.status.xrun.swap(false, Ordering::AcqRel) {
            return Err(PcmError::Underrun);
        }
        self.status.take_failure()
    }

    /// Queue the silent prefill once per reset
    pub(crate) fn prime(&mut self) {
        if self.primed {
            return;
        }
        let silence = self.prefill_samples.min(self.producer.slots());
        if let Ok(chunk) = self.producer.write_chunk_uninit(silence) {
            chunk.fill_from_iter(iter::repeat(0));
        }
        self.primed = true;
    }

    /// Queue whole frames from `buffer`, waiting until `deadline` at most
    ///
    /// Returns the frame count, which is short when the ring stayed full
    /// past the deadline. Underruns are armed from the first write on.
    pub(crate) fn write(
        &mut self,
        buffer: &[i16],
        deadline: Instant,
    ) -> Result<usize, PcmError> {
        let wanted = buffer.len() - buffer.len() % self.channels;
        while self.producer.slots() < wanted && Instant::now() < deadline {
            self.status.take_failure()?;
            thread::sleep(poll_interval(self.period));
        }

        let writable = self.producer.slots().min(wanted);
        let writable = writable - writable % self.channels;
        let chunk = self
            .producer
            .write_chunk_uninit(writable)
            .map_err(|e| PcmError::Backend(e.to_string()))?;
        chunk.fill_from_iter(buffer[..writable].iter().copied());
        self.status.armed.store(true, Ordering::Release);

        Ok(writable / self.channels)
    }

    /// Disarm underruns, clear the latch and queue a fresh prefill next time
    pub(crate) fn reset(&mut self) {
        self.status.armed.store(false, Ordering::Release);
        self.status.xrun.store(false, Ordering::Release);
        self.primed = false;
    }
}
