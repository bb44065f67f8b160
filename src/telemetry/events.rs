//! Core telemetry event types describing session activity exposed to the
//! CLI and any UI shell subscribed to the hub.

use serde::{Deserialize, Serialize};

use crate::analytics::InteractionKind;
use crate::playback::PlaybackStatus;

/// Rich metric events covering status changes, interactions and errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    StatusTransition {
        from: PlaybackStatus,
        to: PlaybackStatus,
        timestamp_ms: u64,
    },
    SessionLoaded {
        token: u64,
        questions: usize,
        duration_secs: f64,
    },
    Interaction {
        kind: InteractionKind,
        audio_time: f64,
        wall_clock_ms: u64,
    },
    Error {
        code: i32,
        context: String,
    },
}
