//! Pulsar Core - Audio Engine
//!
//! This crate provides the audio side of Pulsar:
//! - Device enumeration and a typed open → negotiate → prepare setup (via cpal)
//! - Blocking capture/playback passthrough on a dedicated thread
//! - Publication of each complete period into the shared analysis buffer
//! - The process-wide interrupt flag and persistent settings
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Audio Thread (pulsar-audio)              │
//! │   capture ──read_period──▶ period ──write_period──▶ playback│
//! │                              │                              │
//! │                           publish                           │
//! └──────────────────────────────┼──────────────────────────────┘
//!                                ▼
//!                      SharedAudioBuffer (mutex)
//!                                │
//! ┌──────────────────────────────┼──────────────────────────────┐
//! │                 Presentation Thread                         │
//! │   SpectralAnalyzer ──▶ VisualStateMapper ──▶ RenderSurface  │
//! └─────────────────────────────────────────────────────────────┘
//!        ▲                                           │
//!        └──────────── InterruptFlag ◀───────────────┘
//! ```

mod bridge;
mod config;
mod device;
mod engine;
mod error;
mod interrupt;
mod message;
mod pcm;
mod settings;
mod stream;

pub use config::{EngineConfig, StreamConfig};
pub use device::{AudioDevice, DeviceType};
pub use engine::{AudioEngine, AudioHandle};
pub use error::{EngineError, EngineResult, PcmError};
pub use interrupt::InterruptFlag;
pub use message::{Event, EVENT_CHANNEL_CAPACITY};
pub use pcm::{CaptureDevice, DiscardPlayback, PcmPair, PlaybackDevice, SignalCapture};
pub use settings::{AnalysisSettings, AudioSettings, DisplaySettings, PulsarSettings};
pub use stream::{
    negotiate_params, open_cpal, ClosedPcm, ConfiguredPcm, CpalCapture, CpalPlayback,
    DeviceParams, OpenedPcm,
};

// Re-export DSP types for convenience
pub use pulsar_dsp::SharedAudioBuffer;
