//! Message Types for Thread Communication
//!
//! Events flow from the audio thread to the presentation loop. The audio
//! thread never blocks on this channel; events are dropped when it is full.

use serde::{Deserialize, Serialize};

use crate::config::StreamConfig;

/// Capacity of the engine event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Events sent from the audio thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    /// Devices are running with the negotiated parameters
    Started(StreamConfig),

    /// Audio thread left its loop and released the devices
    Stopped,

    /// Capture returned fewer frames than a period
    ShortRead { expected: usize, got: usize },

    /// Playback accepted fewer frames than offered
    ShortWrite { expected: usize, got: usize },

    /// Capture overrun (fatal after re-prepare)
    Overrun,

    /// Playback underrun (fatal after re-prepare)
    Underrun,

    /// Error occurred
    Error { message: String },
}

impl Event {
    /// Create an error event from any error type
    pub fn error<E: std::fmt::Display>(err: E) -> Self {
        Event::Error {
            message: err.to_string(),
        }
    }
}
