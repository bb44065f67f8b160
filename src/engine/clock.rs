//! Audio clock over a single track.
//!
//! The clock owns at most one emitter at a time. Audio time is derived from
//! the emitter's start offset plus the time elapsed since it started, so the
//! controller never has to ask the output where it is.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;

use crate::audio::AudioTrack;

use super::backend::{AudioOutput, EmitterId, EmitterRequest, TimeSource};
use crate::error::PlaybackError;

// Ids are unique across sessions so a late completion from a torn-down
// session never matches an emitter of the next one.
static NEXT_EMITTER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy)]
struct ActiveEmitter {
    id: EmitterId,
    started_at: Instant,
    offset: f64,
    end: f64,
}

pub struct ClockSource {
    output: Arc<dyn AudioOutput>,
    time: Arc<dyn TimeSource>,
    track: Arc<AudioTrack>,
    active: Option<ActiveEmitter>,
    completion_tx: mpsc::UnboundedSender<EmitterId>,
}

impl ClockSource {
    pub fn new(
        output: Arc<dyn AudioOutput>,
        time: Arc<dyn TimeSource>,
        track: Arc<AudioTrack>,
        completion_tx: mpsc::UnboundedSender<EmitterId>,
    ) -> Self {
        Self {
            output,
            time,
            track,
            active: None,
            completion_tx,
        }
    }

    pub fn track(&self) -> &Arc<AudioTrack> {
        &self.track
    }

    pub fn time_source(&self) -> &Arc<dyn TimeSource> {
        &self.time
    }

    /// Track duration in seconds
    pub fn duration(&self) -> f64 {
        self.track.duration()
    }

    /// Start the track at `offset`, optionally stopping after `duration`
    ///
    /// Any active emitter is stopped first. `offset` is clamped into the
    /// track and the end never runs past it.
    pub fn begin(&mut self, offset: f64, duration: Option<f64>) -> Result<EmitterId, PlaybackError> {
        self.stop();

        let total = self.duration();
        let start = offset.clamp(0.0, total);
        let end = match duration {
            Some(length) => (start + length.max(0.0)).min(total),
            None => total,
        };
        let id = EmitterId(NEXT_EMITTER_ID.fetch_add(1, Ordering::Relaxed));

        self.output.start(EmitterRequest {
            id,
            track: Arc::clone(&self.track),
            offset: start,
            end,
            completion: self.completion_tx.clone(),
        })?;

        self.active = Some(ActiveEmitter {
            id,
            started_at: self.time.now(),
            offset: start,
            end,
        });
        log::debug!(
            "[ClockSource] Emitter {} started at {:.3}s (end {:.3}s)",
            id.0,
            start,
            end
        );
        Ok(id)
    }

    /// Current audio time, or `None` when nothing is playing
    ///
    /// Not clamped: callers compare against `scheduled_end` themselves.
    pub fn now(&self) -> Option<f64> {
        self.active.map(|emitter| {
            let elapsed = self.time.now().saturating_duration_since(emitter.started_at);
            emitter.offset + elapsed.as_secs_f64()
        })
    }

    /// Silence and release the active emitter; no-op when idle
    pub fn stop(&mut self) {
        if let Some(emitter) = self.active.take() {
            if let Err(err) = self.output.stop(emitter.id) {
                log::debug!(
                    "[ClockSource] Ignoring stop failure for emitter {}: {}",
                    emitter.id.0,
                    err
                );
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_id(&self) -> Option<EmitterId> {
        self.active.map(|emitter| emitter.id)
    }

    /// Whether `id` names the emitter currently owned by the clock
    pub fn is_current(&self, id: EmitterId) -> bool {
        self.active_id() == Some(id)
    }

    /// Audio time at which the active emitter stops on its own
    pub fn scheduled_end(&self) -> Option<f64> {
        self.active.map(|emitter| emitter.end)
    }
}

impl Drop for ClockSource {
    fn drop(&mut self) {
        self.stop();
    }
}
