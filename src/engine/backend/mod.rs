//! Backend abstractions for the audio clock.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;

use crate::audio::AudioTrack;
use crate::error::PlaybackError;

/// Identity of a single emitter (one start of the track)
///
/// Completion signals carry the id so a late signal from a replaced emitter
/// can be told apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EmitterId(pub u64);

/// Everything an output needs to start one emitter.
pub struct EmitterRequest {
    pub id: EmitterId,
    pub track: Arc<AudioTrack>,
    /// Audio time (seconds) the emitter starts at
    pub offset: f64,
    /// Audio time (seconds) the emitter stops at on its own
    pub end: f64,
    /// Sent exactly once with `id` when the emitter reaches `end`
    pub completion: mpsc::UnboundedSender<EmitterId>,
}

/// Trait implemented by audio output backends.
///
/// An output plays at most what the clock asks it to; the clock guarantees
/// it never has two emitters running at once.
pub trait AudioOutput: Send + Sync {
    fn start(&self, request: EmitterRequest) -> Result<(), PlaybackError>;
    fn stop(&self, id: EmitterId) -> Result<(), PlaybackError>;
}

/// Trait representing the time source used by the clock and event log.
pub trait TimeSource: Send + Sync {
    /// Monotonic instant used for audio-clock arithmetic
    fn now(&self) -> Instant;

    /// Wall-clock milliseconds since the Unix epoch, used for event timestamps
    fn wall_clock_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Default time source backed by `Instant::now`.
#[derive(Default)]
pub struct SystemTimeSource {
    _unit: (),
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(feature = "device_output")]
mod cpal;
#[cfg(feature = "device_output")]
pub use self::cpal::CpalOutput;

mod stub;
pub use stub::{ManualTimeSource, StubOutput};
