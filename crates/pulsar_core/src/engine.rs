//! Audio Engine - Capture/Playback Passthrough
//!
//! The engine owns both prepared devices and runs a blocking loop:
//! read one period, publish it to the shared buffer, write it to playback.
//! It runs on its own thread (see [`AudioHandle`]) and communicates with
//! the presentation loop only through the shared buffer, the interrupt
//! flag and the event channel.
//!
//! Overruns and underruns re-prepare the affected device once and then stop
//! the loop. Continuing after a torn hardware buffer would play corrupted
//! audio indefinitely, and analysis has no trustworthy source anyway.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use pulsar_dsp::SharedAudioBuffer;
use tracing::{error, info, warn};

use crate::config::{EngineConfig, StreamConfig};
use crate::error::{EngineError, EngineResult, PcmError};
use crate::interrupt::InterruptFlag;
use crate::message::{Event, EVENT_CHANNEL_CAPACITY};
use crate::pcm::{CaptureDevice, PcmPair, PlaybackDevice};
use crate::stream::open_cpal;

/// Capture → shared buffer → playback loop over one pair of devices
pub struct AudioEngine {
    capture: Option<Box<dyn CaptureDevice>>,
    playback: Option<Box<dyn PlaybackDevice>>,
    negotiated: StreamConfig,
    shared: Arc<SharedAudioBuffer>,
    interrupt: InterruptFlag,
    events: Sender<Event>,
    /// Scratch period the devices read into and write from
    period: Vec<i16>,
}

impl AudioEngine {
    /// Open the configured cpal devices
    pub fn open(
        config: EngineConfig,
        interrupt: InterruptFlag,
        events: Sender<Event>,
    ) -> EngineResult<Self> {
        Self::open_with(interrupt, events, move |events| open_cpal(config, events))
    }

    /// Open through `opener`; any failure sets the interrupt flag
    pub fn open_with<F>(
        interrupt: InterruptFlag,
        events: Sender<Event>,
        opener: F,
    ) -> EngineResult<Self>
    where
        F: FnOnce(Sender<Event>) -> EngineResult<PcmPair>,
    {
        let result = opener(events.clone())
            .and_then(|pair| Self::with_devices(pair, interrupt.clone(), events.clone()));

        if let Err(err) = &result {
            error!("Failed to open audio devices: {}", err);
            let _ = events.try_send(Event::error(err));
            interrupt.trigger();
        }
        result
    }

    /// Wrap already-prepared devices
    ///
    /// The shared buffer is sized from the negotiated period.
    pub fn with_devices(
        pair: PcmPair,
        interrupt: InterruptFlag,
        events: Sender<Event>,
    ) -> EngineResult<Self> {
        let negotiated = pair.negotiated;
        let frames = negotiated.frames_per_period as usize;
        let channels = negotiated.channels as usize;
        let shared = Arc::new(SharedAudioBuffer::new(frames, channels)?);

        info!(
            "Audio engine ready: {} -> {} at {}Hz, {}ch, {} frames/period ({:.1}ms)",
            pair.capture.name(),
            pair.playback.name(),
            negotiated.sample_rate,
            negotiated.channels,
            negotiated.frames_per_period,
            negotiated.latency_ms()
        );

        Ok(Self {
            capture: Some(pair.capture),
            playback: Some(pair.playback),
            negotiated,
            shared,
            interrupt,
            events,
            period: vec![0; frames * channels],
        })
    }

    /// Parameters the devices accepted
    pub fn negotiated(&self) -> StreamConfig {
        self.negotiated
    }

    /// Buffer the engine publishes each complete period into
    pub fn shared_buffer(&self) -> Arc<SharedAudioBuffer> {
        Arc::clone(&self.shared)
    }

    pub fn is_open(&self) -> bool {
        self.capture.is_some() && self.playback.is_some()
    }

    /// Pass audio through until the interrupt flag is set
    ///
    /// Returns the error that stopped the loop, after setting the flag.
    pub fn run(&mut self) -> EngineResult<()> {
        if !self.is_open() {
            return Err(EngineError::Closed);
        }

        info!("Audio loop started");
        let _ = self.events.try_send(Event::Started(self.negotiated));

        let mut result = Ok(());
        while !self.interrupt.is_set() {
            if let Err(err) = self.step() {
                error!("Audio loop stopping: {}", err);
                let _ = self.events.try_send(Event::error(&err));
                self.interrupt.trigger();
                result = Err(err);
                break;
            }
        }

        info!("Audio loop exited");
        result
    }

    /// One period: capture, publish, passthrough
    fn step(&mut self) -> EngineResult<()> {
        let Self {
            capture,
            playback,
            negotiated,
            shared,
            events,
            period,
            ..
        } = self;
        let (Some(capture), Some(playback)) = (capture.as_deref_mut(), playback.as_deref_mut())
        else {
            return Err(EngineError::Closed);
        };

        let frames = negotiated.frames_per_period as usize;
        let channels = negotiated.channels as usize;

        let read = match capture.read_period(period) {
            Ok(read) => read.min(frames),
            Err(err) if err.is_xrun() => {
                error!("Capture {}", err);
                let _ = events.try_send(xrun_event(&err));
                if let Err(e) = capture.prepare() {
                    error!("Failed to re-prepare capture: {}", e);
                }
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        };

        if read < frames {
            warn!("Short read: expected {} frames, got {}", frames, read);
            let _ = events.try_send(Event::ShortRead {
                expected: frames,
                got: read,
            });
        } else {
            shared.publish(period)?;
        }

        if read == 0 {
            return Ok(());
        }

        match playback.write_period(&period[..read * channels]) {
            Ok(written) if written < read => {
                warn!("Short write: expected {} frames, wrote {}", read, written);
                let _ = events.try_send(Event::ShortWrite {
                    expected: read,
                    got: written,
                });
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(err) if err.is_xrun() => {
                error!("Playback {}", err);
                let _ = events.try_send(xrun_event(&err));
                if let Err(e) = playback.prepare() {
                    error!("Failed to re-prepare playback: {}", e);
                }
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Release both devices and the scratch period; safe to call repeatedly
    pub fn close(&mut self) {
        let had_capture = self.capture.take().is_some();
        let had_playback = self.playback.take().is_some();
        self.period = Vec::new();

        if had_capture || had_playback {
            info!("Audio devices released");
        }
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.close();
    }
}

fn xrun_event(err: &PcmError) -> Event {
    match err {
        PcmError::Underrun => Event::Underrun,
        _ => Event::Overrun,
    }
}

/// Running audio thread plus what the presentation loop needs from it
pub struct AudioHandle {
    thread: Option<JoinHandle<EngineResult<()>>>,
    shared: Arc<SharedAudioBuffer>,
    negotiated: StreamConfig,
    events: Receiver<Event>,
    interrupt: InterruptFlag,
}

type Ready = EngineResult<(StreamConfig, Arc<SharedAudioBuffer>)>;

impl AudioHandle {
    /// Spawn the audio thread on the configured cpal devices
    pub fn spawn(config: EngineConfig, interrupt: InterruptFlag) -> EngineResult<Self> {
        Self::spawn_with(interrupt, move |events| open_cpal(config, events))
    }

    /// Spawn the audio thread, opening devices through `opener` on that thread
    ///
    /// Blocks until the devices are open (or failed to open), so the caller
    /// can size its analysis from the negotiated period.
    pub fn spawn_with<F>(interrupt: InterruptFlag, opener: F) -> EngineResult<Self>
    where
        F: FnOnce(Sender<Event>) -> EngineResult<PcmPair> + Send + 'static,
    {
        let (event_sender, event_receiver) = bounded::<Event>(EVENT_CHANNEL_CAPACITY);
        let (ready_sender, ready_receiver) = bounded::<Ready>(1);
        let thread_interrupt = interrupt.clone();

        let thread = thread::Builder::new()
            .name("pulsar-audio".into())
            .spawn(move || {
                info!("Audio thread started");

                let mut engine =
                    match AudioEngine::open_with(thread_interrupt, event_sender.clone(), opener) {
                        Ok(engine) => engine,
                        Err(err) => {
                            // Reported through the handshake
                            let _ = ready_sender.send(Err(err));
                            return Ok(());
                        }
                    };
                let _ = ready_sender.send(Ok((engine.negotiated(), engine.shared_buffer())));

                let result = engine.run();
                engine.close();
                let _ = event_sender.try_send(Event::Stopped);
                info!("Audio thread stopped");
                result
            })
            .map_err(|e| EngineError::ThreadSpawn(e.to_string()))?;

        match ready_receiver.recv() {
            Ok(Ok((negotiated, shared))) => Ok(Self {
                thread: Some(thread),
                shared,
                negotiated,
                events: event_receiver,
                interrupt,
            }),
            Ok(Err(err)) => {
                let _ = thread.join();
                Err(err)
            }
            Err(_) => {
                interrupt.trigger();
                let _ = thread.join();
                Err(EngineError::ThreadLost)
            }
        }
    }

    pub fn negotiated(&self) -> StreamConfig {
        self.negotiated
    }

    pub fn shared_buffer(&self) -> &Arc<SharedAudioBuffer> {
        &self.shared
    }

    /// Get next event (non-blocking)
    pub fn poll_event(&self) -> Option<Event> {
        self.events.try_recv().ok()
    }

    /// Whether the audio thread has exited
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Stop the audio thread and return how its loop ended
    pub fn join(mut self) -> EngineResult<()> {
        self.interrupt.trigger();
        self.join_thread()
    }

    fn join_thread(&mut self) -> EngineResult<()> {
        match self.thread.take() {
            Some(handle) => handle.join().map_err(|_| EngineError::ThreadLost)?,
            None => Ok(()),
        }
    }
}

impl Drop for AudioHandle {
    fn drop(&mut self) {
        // Signal shutdown and wait for the devices to be released
        self.interrupt.trigger();
        let _ = self.join_thread();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::pcm::DiscardPlayback;

    const FRAMES: usize = 64;
    const CHANNELS: usize = 2;

    fn test_config() -> StreamConfig {
        StreamConfig {
            sample_rate: 44100,
            channels: CHANNELS as u16,
            frames_per_period: FRAMES as u32,
        }
    }

    /// Capture double: plays back a script, stamping each period with its
    /// sequence number. Triggers the interrupt once the script runs out.
    struct ScriptedCapture {
        script: VecDeque<Result<usize, PcmError>>,
        stamp: i16,
        prepares: Arc<AtomicUsize>,
        interrupt: InterruptFlag,
    }

    impl CaptureDevice for ScriptedCapture {
        fn read_period(&mut self, buffer: &mut [i16]) -> Result<usize, PcmError> {
            let step = match self.script.pop_front() {
                Some(step) => step,
                None => {
                    self.interrupt.trigger();
                    Ok(0)
                }
            };
            let frames = step?;
            self.stamp += 1;
            buffer[..frames * CHANNELS].fill(self.stamp);
            Ok(frames)
        }

        fn prepare(&mut self) -> Result<(), PcmError> {
            self.prepares.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    /// Playback double recording every write
    struct RecordingPlayback {
        written: Arc<Mutex<Vec<Vec<i16>>>>,
        script: VecDeque<Result<Option<usize>, PcmError>>,
        prepares: Arc<AtomicUsize>,
    }

    impl PlaybackDevice for RecordingPlayback {
        fn write_period(&mut self, buffer: &[i16]) -> Result<usize, PcmError> {
            let frames = match self.script.pop_front() {
                Some(step) => step?,
                None => None,
            }
            .unwrap_or(buffer.len() / CHANNELS);
            self.written.lock().push(buffer.to_vec());
            Ok(frames)
        }

        fn prepare(&mut self) -> Result<(), PcmError> {
            self.prepares.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    struct Harness {
        engine: AudioEngine,
        interrupt: InterruptFlag,
        events: Receiver<Event>,
        written: Arc<Mutex<Vec<Vec<i16>>>>,
        capture_prepares: Arc<AtomicUsize>,
        playback_prepares: Arc<AtomicUsize>,
    }

    impl Harness {
        fn drain_events(&self) -> Vec<Event> {
            self.events.try_iter().collect()
        }
    }

    fn harness(
        capture_script: Vec<Result<usize, PcmError>>,
        playback_script: Vec<Result<Option<usize>, PcmError>>,
    ) -> Harness {
        let interrupt = InterruptFlag::new();
        let (sender, events) = crossbeam_channel::unbounded();
        let written = Arc::new(Mutex::new(Vec::new()));
        let capture_prepares = Arc::new(AtomicUsize::new(0));
        let playback_prepares = Arc::new(AtomicUsize::new(0));

        let pair = PcmPair {
            capture: Box::new(ScriptedCapture {
                script: capture_script.into(),
                stamp: 0,
                prepares: Arc::clone(&capture_prepares),
                interrupt: interrupt.clone(),
            }),
            playback: Box::new(RecordingPlayback {
                written: Arc::clone(&written),
                script: playback_script.into(),
                prepares: Arc::clone(&playback_prepares),
            }),
            negotiated: test_config(),
        };
        let engine = AudioEngine::with_devices(pair, interrupt.clone(), sender).unwrap();

        Harness {
            engine,
            interrupt,
            events,
            written,
            capture_prepares,
            playback_prepares,
        }
    }

    #[test]
    fn test_passthrough_publishes_and_plays_each_period() {
        let mut h = harness(vec![Ok(FRAMES), Ok(FRAMES), Ok(FRAMES)], vec![]);

        assert!(h.engine.run().is_ok());

        let written = h.written.lock();
        assert_eq!(written.len(), 3);
        for (i, period) in written.iter().enumerate() {
            assert_eq!(period.len(), FRAMES * CHANNELS);
            assert!(period.iter().all(|&s| s == i as i16 + 1));
        }
        drop(written);

        // Shared buffer holds the latest complete period
        assert!(h.engine.shared_buffer().snapshot().iter().all(|&s| s == 3));
        assert_eq!(h.drain_events()[0], Event::Started(test_config()));
    }

    #[test]
    fn test_overrun_reprepares_then_stops() {
        let mut h = harness(vec![Ok(FRAMES), Err(PcmError::Overrun), Ok(FRAMES)], vec![]);

        let result = h.engine.run();
        assert!(matches!(result, Err(EngineError::DeviceIo(PcmError::Overrun))));
        assert!(h.interrupt.is_set());
        assert_eq!(h.capture_prepares.load(Ordering::SeqCst), 1);
        // Only the period before the overrun went through
        assert_eq!(h.written.lock().len(), 1);

        let events = h.drain_events();
        assert!(events.contains(&Event::Overrun));
        assert!(events.iter().any(|e| matches!(e, Event::Error { .. })));
    }

    #[test]
    fn test_underrun_reprepares_then_stops() {
        let mut h = harness(
            vec![Ok(FRAMES), Ok(FRAMES), Ok(FRAMES)],
            vec![Ok(None), Err(PcmError::Underrun)],
        );

        let result = h.engine.run();
        assert!(matches!(result, Err(EngineError::DeviceIo(PcmError::Underrun))));
        assert!(h.interrupt.is_set());
        assert_eq!(h.playback_prepares.load(Ordering::SeqCst), 1);
        assert_eq!(h.capture_prepares.load(Ordering::SeqCst), 0);
        assert!(h.drain_events().contains(&Event::Underrun));
    }

    #[test]
    fn test_xrun_on_capture_reprepares_capture() {
        // Some backends report a starved capture as an underrun
        let mut h = harness(vec![Ok(FRAMES), Err(PcmError::Underrun)], vec![]);

        let result = h.engine.run();
        assert!(matches!(result, Err(EngineError::DeviceIo(PcmError::Underrun))));
        assert_eq!(h.capture_prepares.load(Ordering::SeqCst), 1);
        assert_eq!(h.playback_prepares.load(Ordering::SeqCst), 0);
        assert!(h.drain_events().contains(&Event::Underrun));
    }

    #[test]
    fn test_backend_error_stops_without_reprepare() {
        let mut h = harness(vec![Err(PcmError::Backend("io".into()))], vec![]);

        let result = h.engine.run();
        assert!(matches!(result, Err(EngineError::DeviceIo(PcmError::Backend(_)))));
        assert!(h.interrupt.is_set());
        assert_eq!(h.capture_prepares.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_short_read_is_tolerated() {
        let mut h = harness(vec![Ok(FRAMES), Ok(FRAMES / 2), Ok(FRAMES)], vec![]);

        assert!(h.engine.run().is_ok());

        let written = h.written.lock();
        assert_eq!(written.len(), 3);
        // The partial period is still passed through
        assert_eq!(written[1].len(), FRAMES / 2 * CHANNELS);
        drop(written);

        assert!(h.drain_events().contains(&Event::ShortRead {
            expected: FRAMES,
            got: FRAMES / 2
        }));
    }

    #[test]
    fn test_short_read_does_not_publish() {
        let mut h = harness(vec![Ok(FRAMES), Ok(FRAMES / 2)], vec![]);

        assert!(h.engine.run().is_ok());
        // Stamp 1 survives; stamp 2 was partial
        assert!(h.engine.shared_buffer().snapshot().iter().all(|&s| s == 1));
    }

    #[test]
    fn test_short_write_is_tolerated() {
        let mut h = harness(vec![Ok(FRAMES), Ok(FRAMES)], vec![Ok(Some(10))]);

        assert!(h.engine.run().is_ok());
        assert_eq!(h.written.lock().len(), 2);
        assert!(h.drain_events().contains(&Event::ShortWrite {
            expected: FRAMES,
            got: 10
        }));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut h = harness(vec![], vec![]);
        assert!(h.engine.is_open());

        h.engine.close();
        h.engine.close();
        assert!(!h.engine.is_open());
        assert!(matches!(h.engine.run(), Err(EngineError::Closed)));
    }

    #[test]
    fn test_open_failure_sets_interrupt() {
        let interrupt = InterruptFlag::new();
        let (sender, events) = crossbeam_channel::unbounded();

        let result = AudioEngine::open_with(interrupt.clone(), sender, |_| {
            Err(EngineError::DeviceOpen {
                direction: crate::device::DeviceType::Capture,
                reason: "busy".into(),
            })
        });

        assert!(matches!(result, Err(EngineError::DeviceOpen { .. })));
        assert!(interrupt.is_set());
        assert!(matches!(events.try_recv(), Ok(Event::Error { .. })));
    }

    #[test]
    fn test_zero_period_rejected() {
        let config = StreamConfig {
            frames_per_period: 0,
            ..test_config()
        };
        let pair = PcmPair::synthetic(config, 440.0, false);
        let (sender, _events) = crossbeam_channel::unbounded();

        let result = AudioEngine::with_devices(pair, InterruptFlag::new(), sender);
        assert!(matches!(result, Err(EngineError::DspError(_))));
    }

    #[test]
    fn test_handle_runs_synthetic_devices() {
        let interrupt = InterruptFlag::new();
        let config = StreamConfig::from_period_ms(44100, 2, 10);
        let handle = AudioHandle::spawn_with(interrupt.clone(), move |_| {
            Ok(PcmPair::synthetic(config, 440.0, true))
        })
        .unwrap();

        assert_eq!(handle.negotiated(), config);
        assert_eq!(handle.shared_buffer().len(), config.samples_per_period());

        thread::sleep(Duration::from_millis(60));
        assert!(handle.shared_buffer().snapshot().iter().any(|&s| s != 0));
        assert_eq!(handle.poll_event(), Some(Event::Started(config)));

        assert!(handle.join().is_ok());
        assert!(interrupt.is_set());
    }

    #[test]
    fn test_handle_reports_open_failure() {
        let interrupt = InterruptFlag::new();
        let result = AudioHandle::spawn_with(interrupt.clone(), |_| {
            Err(EngineError::ParameterNegotiation {
                direction: crate::device::DeviceType::Playback,
                reason: "rate mismatch".into(),
            })
        });

        assert!(matches!(result, Err(EngineError::ParameterNegotiation { .. })));
        assert!(interrupt.is_set());
    }

    #[test]
    fn test_handle_surfaces_loop_error_on_join() {
        let interrupt = InterruptFlag::new();
        let loop_interrupt = interrupt.clone();
        let handle = AudioHandle::spawn_with(interrupt.clone(), move |_| {
            Ok(PcmPair {
                capture: Box::new(ScriptedCapture {
                    script: vec![Ok(FRAMES), Err(PcmError::Overrun)].into(),
                    stamp: 0,
                    prepares: Arc::new(AtomicUsize::new(0)),
                    interrupt: loop_interrupt,
                }),
                playback: Box::new(DiscardPlayback::new(CHANNELS as u16)),
                negotiated: test_config(),
            })
        })
        .unwrap();

        // The loop stops on its own
        while !handle.is_finished() {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(interrupt.is_set());
        assert!(matches!(
            handle.join(),
            Err(EngineError::DeviceIo(PcmError::Overrun))
        ));
    }
}
