//! cpal-backed PCM devices
//!
//! Device setup is a one-way sequence of typed states:
//!
//! ```text
//!   ClosedPcm ──open()──▶ OpenedPcm ──negotiate()──▶ ConfiguredPcm ──prepare()──▶ PcmPair
//!   (config)              (devices)                  (parameters)                 (streams built)
//! ```
//!
//! `AudioEngine::run` is the running state. Each step consumes the previous
//! one, so a failure part-way drops whatever was acquired so far.
//!
//! cpal delivers audio through callbacks. The engine wants blocking
//! one-period transfers, so each device is bridged through an rtrb ring
//! (see `bridge`). The types here only own the cpal streams and start them
//! on the first transfer.

use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{
    BuildStreamError, Device, FromSample, SampleFormat, SizedSample, Stream,
    SupportedBufferSize, SupportedStreamConfigRange,
};
use crossbeam_channel::Sender;
use tracing::{info, warn};

use crate::bridge::{
    capture_bridge, playback_bridge, CaptureBridge, CaptureFeed, PlaybackBridge, PlaybackDrain,
};
use crate::config::{EngineConfig, StreamConfig};
use crate::device::{find_device, DeviceType};
use crate::error::{EngineError, EngineResult, PcmError};
use crate::message::Event;
use crate::pcm::{CaptureDevice, PcmPair, PlaybackDevice};

/// Extra wait allowed on the very first transfer while a stream spins up
const STARTUP_GRACE: Duration = Duration::from_millis(500);

/// Parameters one device accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceParams {
    pub sample_rate: u32,
    pub channels: u16,
    /// `None` when the device does not report a period range
    pub period_frames: Option<u32>,
    pub sample_format: SampleFormat,
}

impl DeviceParams {
    fn cpal_config(&self) -> cpal::StreamConfig {
        cpal::StreamConfig {
            channels: self.channels,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: match self.period_frames {
                Some(frames) => cpal::BufferSize::Fixed(frames),
                None => cpal::BufferSize::Default,
            },
        }
    }
}

/// Pick the closest supported parameters to `requested`
///
/// Only ranges with the requested channel count and an i16 or f32 sample
/// format qualify. The range nearest the requested rate wins, i16 breaking
/// ties. Rate and period are then clamped into that range.
pub fn negotiate_params(
    ranges: &[SupportedStreamConfigRange],
    requested: &StreamConfig,
) -> Result<DeviceParams, String> {
    let format_rank = |format: SampleFormat| match format {
        SampleFormat::I16 => 0,
        _ => 1,
    };
    let rate_distance = |range: &SupportedStreamConfigRange| {
        let min = range.min_sample_rate().0;
        let max = range.max_sample_rate().0;
        if requested.sample_rate < min {
            min - requested.sample_rate
        } else {
            requested.sample_rate.saturating_sub(max)
        }
    };

    let range = ranges
        .iter()
        .filter(|r| r.channels() == requested.channels)
        .filter(|r| matches!(r.sample_format(), SampleFormat::I16 | SampleFormat::F32))
        .min_by_key(|r| (rate_distance(r), format_rank(r.sample_format())))
        .ok_or_else(|| {
            format!(
                "no {}-channel i16/f32 configuration available",
                requested.channels
            )
        })?;

    let sample_rate = requested
        .sample_rate
        .clamp(range.min_sample_rate().0, range.max_sample_rate().0);
    let period_frames = match range.buffer_size() {
        SupportedBufferSize::Range { min, max } => {
            Some(requested.frames_per_period.clamp(*min, (*max).max(*min)))
        }
        SupportedBufferSize::Unknown => None,
    };

    Ok(DeviceParams {
        sample_rate,
        channels: range.channels(),
        period_frames,
        sample_format: range.sample_format(),
    })
}

/// Setup start: configuration validated, nothing acquired
pub struct ClosedPcm {
    config: EngineConfig,
}

impl ClosedPcm {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.stream.validate().map_err(EngineError::ConfigError)?;
        Ok(Self { config })
    }

    /// Resolve both devices on `host`
    pub fn open(self, host: &cpal::Host) -> EngineResult<OpenedPcm> {
        let capture =
            find_device(host, DeviceType::Capture, self.config.capture_device.as_deref())?;
        let playback =
            find_device(host, DeviceType::Playback, self.config.playback_device.as_deref())?;

        let capture_name = device_name(&capture);
        let playback_name = device_name(&playback);
        info!("Opened capture '{}' and playback '{}'", capture_name, playback_name);

        Ok(OpenedPcm {
            config: self.config,
            capture,
            playback,
            capture_name,
            playback_name,
        })
    }
}

/// Both devices resolved, parameters not yet applied
pub struct OpenedPcm {
    config: EngineConfig,
    capture: Device,
    playback: Device,
    capture_name: String,
    playback_name: String,
}

impl OpenedPcm {
    /// Negotiate near-requested parameters for both devices
    ///
    /// Capture is negotiated first; playback is then asked for exactly what
    /// capture accepted and must agree on the rate.
    pub fn negotiate(self) -> EngineResult<ConfiguredPcm> {
        let requested = self.config.stream;

        let capture_ranges: Vec<_> = self
            .capture
            .supported_input_configs()
            .map_err(|e| negotiation_error(DeviceType::Capture, e))?
            .collect();
        let capture_params = negotiate_params(&capture_ranges, &requested)
            .map_err(|reason| negotiation_error(DeviceType::Capture, reason))?;

        let negotiated = StreamConfig {
            sample_rate: capture_params.sample_rate,
            channels: capture_params.channels,
            frames_per_period: capture_params
                .period_frames
                .unwrap_or(requested.frames_per_period),
        };

        let playback_ranges: Vec<_> = self
            .playback
            .supported_output_configs()
            .map_err(|e| negotiation_error(DeviceType::Playback, e))?
            .collect();
        let playback_params = negotiate_params(&playback_ranges, &negotiated)
            .map_err(|reason| negotiation_error(DeviceType::Playback, reason))?;

        if playback_params.sample_rate != negotiated.sample_rate {
            return Err(negotiation_error(
                DeviceType::Playback,
                format!(
                    "capture runs at {}Hz but playback only offers {}Hz",
                    negotiated.sample_rate, playback_params.sample_rate
                ),
            ));
        }

        if negotiated != requested {
            warn!(
                "Requested {}Hz/{}ch/{} frames, devices accepted {}Hz/{}ch/{} frames",
                requested.sample_rate,
                requested.channels,
                requested.frames_per_period,
                negotiated.sample_rate,
                negotiated.channels,
                negotiated.frames_per_period
            );
        }
        info!(
            "Negotiated capture {:?} ({:?}), playback {:?} ({:?})",
            capture_params.period_frames,
            capture_params.sample_format,
            playback_params.period_frames,
            playback_params.sample_format
        );

        Ok(ConfiguredPcm {
            config: self.config,
            capture: self.capture,
            playback: self.playback,
            capture_name: self.capture_name,
            playback_name: self.playback_name,
            capture_params,
            playback_params,
            negotiated,
        })
    }
}

/// Parameters agreed, streams not yet built
pub struct ConfiguredPcm {
    config: EngineConfig,
    capture: Device,
    playback: Device,
    capture_name: String,
    playback_name: String,
    capture_params: DeviceParams,
    playback_params: DeviceParams,
    negotiated: StreamConfig,
}

impl ConfiguredPcm {
    pub fn negotiated(&self) -> StreamConfig {
        self.negotiated
    }

    /// Build both streams (paused) and their rings
    pub fn prepare(self, events: Sender<Event>) -> EngineResult<PcmPair> {
        let samples_per_period = self.negotiated.samples_per_period();
        let period = Duration::from_secs_f64(self.negotiated.latency_ms() as f64 / 1000.0);
        let channels = self.negotiated.channels as usize;

        let (feed, capture_side) = capture_bridge(samples_per_period, channels, period);
        let capture_stream = match self.capture_params.sample_format {
            SampleFormat::I16 => build_capture_stream::<i16>(
                &self.capture,
                &self.capture_params,
                feed,
                events.clone(),
            ),
            _ => build_capture_stream::<f32>(
                &self.capture,
                &self.capture_params,
                feed,
                events.clone(),
            ),
        }?;

        let (drain, playback_side) = playback_bridge(
            samples_per_period,
            channels,
            period,
            self.config.playback_prefill_periods,
        );
        let playback_stream = match self.playback_params.sample_format {
            SampleFormat::I16 => build_playback_stream::<i16>(
                &self.playback,
                &self.playback_params,
                drain,
                events.clone(),
            ),
            _ => build_playback_stream::<f32>(
                &self.playback,
                &self.playback_params,
                drain,
                events,
            ),
        }?;

        Ok(PcmPair {
            capture: Box::new(CpalCapture {
                stream: capture_stream,
                bridge: capture_side,
                started: false,
                name: self.capture_name,
            }),
            playback: Box::new(CpalPlayback {
                stream: playback_stream,
                bridge: playback_side,
                started: false,
                name: self.playback_name,
            }),
            negotiated: self.negotiated,
        })
    }
}

/// Run the whole setup sequence on the default host
pub fn open_cpal(config: EngineConfig, events: Sender<Event>) -> EngineResult<PcmPair> {
    let host = cpal::default_host();
    ClosedPcm::new(config)?
        .open(&host)?
        .negotiate()?
        .prepare(events)
}

fn device_name(device: &Device) -> String {
    device.name().unwrap_or_else(|_| "<unnamed>".to_string())
}

fn negotiation_error(direction: DeviceType, reason: impl ToString) -> EngineError {
    EngineError::ParameterNegotiation {
        direction,
        reason: reason.to_string(),
    }
}

fn build_error(direction: DeviceType, err: BuildStreamError) -> EngineError {
    match err {
        BuildStreamError::DeviceNotAvailable => EngineError::DeviceOpen {
            direction,
            reason: err.to_string(),
        },
        other => negotiation_error(direction, other),
    }
}

fn build_capture_stream<T>(
    device: &Device,
    params: &DeviceParams,
    mut feed: CaptureFeed,
    events: Sender<Event>,
) -> EngineResult<Stream>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let status = feed.status();

    let stream = device
        .build_input_stream(
            &params.cpal_config(),
            move |data: &[T], _: &cpal::InputCallbackInfo| feed.push(data),
            move |err| status.report(err, &events),
            None,
        )
        .map_err(|e| build_error(DeviceType::Capture, e))?;

    // Started by the first read
    let _ = stream.pause();
    Ok(stream)
}

fn build_playback_stream<T>(
    device: &Device,
    params: &DeviceParams,
    mut drain: PlaybackDrain,
    events: Sender<Event>,
) -> EngineResult<Stream>
where
    T: SizedSample + FromSample<i16>,
{
    let status = drain.status();

    let stream = device
        .build_output_stream(
            &params.cpal_config(),
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| drain.pull(data),
            move |err| status.report(err, &events),
            None,
        )
        .map_err(|e| build_error(DeviceType::Playback, e))?;

    // Started by the first write, after the prefill is queued
    let _ = stream.pause();
    Ok(stream)
}

/// Capture side of a cpal input stream
pub struct CpalCapture {
    stream: Stream,
    bridge: CaptureBridge,
    started: bool,
    name: String,
}

impl CaptureDevice for CpalCapture {
    fn read_period(&mut self, buffer: &mut [i16]) -> Result<usize, PcmError> {
        self.bridge.check()?;

        let mut deadline = Instant::now() + self.bridge.period() * 2;
        if !self.started {
            self.stream
                .play()
                .map_err(|e| PcmError::Backend(e.to_string()))?;
            self.started = true;
            deadline += STARTUP_GRACE;
        }

        self.bridge.read(buffer, deadline)
    }

    fn prepare(&mut self) -> Result<(), PcmError> {
        self.bridge.reset();
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Playback side of a cpal output stream
pub struct CpalPlayback {
    stream: Stream,
    bridge: PlaybackBridge,
    started: bool,
    name: String,
}

impl PlaybackDevice for CpalPlayback {
    fn write_period(&mut self, buffer: &[i16]) -> Result<usize, PcmError> {
        self.bridge.check()?;
        self.bridge.prime();
        if !self.started {
            self.stream
                .play()
                .map_err(|e| PcmError::Backend(e.to_string()))?;
            self.started = true;
        }

        let deadline = Instant::now() + self.bridge.period() * 2;
        self.bridge.write(buffer, deadline)
    }

    fn prepare(&mut self) -> Result<(), PcmError> {
        self.bridge.reset();
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(
        channels: u16,
        min_rate: u32,
        max_rate: u32,
        buffer: SupportedBufferSize,
        format: SampleFormat,
    ) -> SupportedStreamConfigRange {
        SupportedStreamConfigRange::new(
            channels,
            cpal::SampleRate(min_rate),
            cpal::SampleRate(max_rate),
            buffer,
            format,
        )
    }

    #[test]
    fn test_exact_match_keeps_request() {
        let ranges = [range(
            2,
            8000,
            192000,
            SupportedBufferSize::Range { min: 64, max: 8192 },
            SampleFormat::I16,
        )];
        let params = negotiate_params(&ranges, &StreamConfig::default()).unwrap();

        assert_eq!(params.sample_rate, 44100);
        assert_eq!(params.channels, 2);
        assert_eq!(params.period_frames, Some(2205));
        assert_eq!(params.sample_format, SampleFormat::I16);
    }

    #[test]
    fn test_near_values_are_clamped() {
        let ranges = [range(
            2,
            48000,
            48000,
            SupportedBufferSize::Range {
                min: 256,
                max: 1024,
            },
            SampleFormat::F32,
        )];
        let params = negotiate_params(&ranges, &StreamConfig::default()).unwrap();

        assert_eq!(params.sample_rate, 48000);
        assert_eq!(params.period_frames, Some(1024));
        assert_eq!(params.sample_format, SampleFormat::F32);
    }

    #[test]
    fn test_prefers_closest_rate_then_i16() {
        let ranges = [
            range(2, 96000, 96000, SupportedBufferSize::Unknown, SampleFormat::I16),
            range(2, 44100, 48000, SupportedBufferSize::Unknown, SampleFormat::F32),
            range(2, 44100, 48000, SupportedBufferSize::Unknown, SampleFormat::I16),
        ];
        let params = negotiate_params(&ranges, &StreamConfig::default()).unwrap();

        assert_eq!(params.sample_rate, 44100);
        assert_eq!(params.sample_format, SampleFormat::I16);
        assert_eq!(params.period_frames, None);
    }

    #[test]
    fn test_no_matching_channels_fails() {
        let ranges = [range(
            1,
            8000,
            48000,
            SupportedBufferSize::Unknown,
            SampleFormat::I16,
        )];
        let err = negotiate_params(&ranges, &StreamConfig::default()).unwrap_err();
        assert!(err.contains("2-channel"));
    }

    #[test]
    fn test_unsupported_formats_skipped() {
        let ranges = [range(
            2,
            8000,
            48000,
            SupportedBufferSize::Unknown,
            SampleFormat::U8,
        )];
        assert!(negotiate_params(&ranges, &StreamConfig::default()).is_err());
    }

    #[test]
    fn test_device_params_to_cpal() {
        let params = DeviceParams {
            sample_rate: 44100,
            channels: 2,
            period_frames: Some(2205),
            sample_format: SampleFormat::I16,
        };
        let config = params.cpal_config();
        assert_eq!(config.sample_rate.0, 44100);
        assert_eq!(config.buffer_size, cpal::BufferSize::Fixed(2205));

        let unknown = DeviceParams {
            period_frames: None,
            ..params
        };
        assert_eq!(unknown.cpal_config().buffer_size, cpal::BufferSize::Default);
    }

    #[test]
    fn test_closed_rejects_invalid_config() {
        let mut config = EngineConfig::default();
        config.stream.frames_per_period = 1;
        assert!(matches!(
            ClosedPcm::new(config),
            Err(EngineError::ConfigError(_))
        ));
    }

    // Hardware-dependent tests
    #[test]
    #[ignore = "requires audio hardware"]
    fn test_open_default_devices() {
        let (sender, _receiver) = crossbeam_channel::unbounded();
        if let Ok(mut pair) = open_cpal(EngineConfig::default(), sender) {
            let mut buffer = vec![0i16; pair.negotiated.samples_per_period()];
            let frames = pair.capture.read_period(&mut buffer).unwrap();
            assert!(frames <= pair.negotiated.frames_per_period as usize);
        }
    }
}
