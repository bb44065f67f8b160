//! Playback controller: the status state machine over the audio clock.
//!
//! The controller owns the [`ClockSource`] and the [`InteractionLog`]. Every
//! learner action on the timeline goes through it so the published position,
//! the paused offset and the logged interactions stay consistent with each
//! other.
//!
//! Status flow: `ready ⇄ playing`, `ready | playing → submitted`. Idle and
//! loading belong to the session manager, which only builds a controller once
//! the exercise and its audio are both available.

use serde::{Deserialize, Serialize};

use crate::analytics::{InteractionKind, InteractionLog};
use crate::engine::{ClockSource, EmitterId};
use crate::error::PlaybackError;

/// Session/playback status as seen by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Playing,
    Submitted,
}

/// Point-in-time view of the controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub status: PlaybackStatus,
    /// Published position, always within [0, duration]
    pub position: f64,
    /// Where the next `play()` resumes from
    pub paused_offset: f64,
    pub duration: f64,
    pub replay_count: usize,
}

/// Result of one polling step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Nothing is playing; the poller should stop
    Stopped,
    /// Position published while still playing
    Position(f64),
    /// The emitter reached its scheduled end at this position
    Ended(f64),
}

pub struct PlaybackController {
    clock: ClockSource,
    log: InteractionLog,
    status: PlaybackStatus,
    position: f64,
    paused_offset: f64,
    replay_threshold: f64,
    excerpt_end: Option<f64>,
}

impl PlaybackController {
    /// Controller for a freshly loaded track, starting in `Ready`
    pub fn new(clock: ClockSource, replay_threshold: f64) -> Self {
        Self {
            clock,
            log: InteractionLog::new(),
            status: PlaybackStatus::Ready,
            position: 0.0,
            paused_offset: 0.0,
            replay_threshold,
            excerpt_end: None,
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn paused_offset(&self) -> f64 {
        self.paused_offset
    }

    pub fn duration(&self) -> f64 {
        self.clock.duration()
    }

    pub fn log(&self) -> &InteractionLog {
        &self.log
    }

    pub fn replay_count(&self) -> usize {
        self.log.replay_count()
    }

    pub fn active_emitter(&self) -> Option<EmitterId> {
        self.clock.active_id()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            status: self.status,
            position: self.position,
            paused_offset: self.paused_offset,
            duration: self.duration(),
            replay_count: self.replay_count(),
        }
    }

    /// Start playing from the paused offset
    ///
    /// Starting within the replay threshold of the beginning logs a replay.
    pub fn play(&mut self) -> Result<(), PlaybackError> {
        self.require("play", &[PlaybackStatus::Ready])?;

        let offset = self.paused_offset.clamp(0.0, self.duration());
        self.start_clock(offset, None)?;
        self.position = offset;
        self.excerpt_end = None;

        if offset < self.replay_threshold {
            self.record(InteractionKind::Replay, 0.0);
        }
        self.transition(PlaybackStatus::Playing);
        Ok(())
    }

    /// Stop at the current audio time and remember it as the resume point
    pub fn pause(&mut self) -> Result<(), PlaybackError> {
        self.require("pause", &[PlaybackStatus::Playing])?;

        // Reached the end before the poller noticed: that is a stop, not a pause
        if let (Some(now), Some(end)) = (self.clock.now(), self.clock.scheduled_end()) {
            if now >= end {
                self.finish_emitter(end);
                return Ok(());
            }
        }

        let elapsed = self.current_time();
        self.clock.stop();
        self.paused_offset = elapsed;
        self.position = elapsed;
        self.excerpt_end = None;
        self.record(InteractionKind::Pause, elapsed);
        self.transition(PlaybackStatus::Ready);
        Ok(())
    }

    /// Single play/pause control
    pub fn toggle(&mut self) -> Result<(), PlaybackError> {
        match self.status {
            PlaybackStatus::Playing => self.pause(),
            _ => self.play(),
        }
    }

    /// Move the timeline to `target` seconds
    ///
    /// Forward only when the target is past the published position; landing
    /// on it counts as backward. Restarts the clock when playing, which is
    /// never logged as a replay.
    pub fn seek(&mut self, target: f64) -> Result<(), PlaybackError> {
        self.require("seek", &[PlaybackStatus::Ready, PlaybackStatus::Playing])?;
        if !target.is_finite() {
            return Err(PlaybackError::InvalidPosition { seconds: target });
        }

        let target = target.clamp(0.0, self.duration());
        let kind = if target > self.position {
            InteractionKind::SeekForward
        } else {
            InteractionKind::SeekBackward
        };

        self.position = target;
        self.paused_offset = target;
        self.record(kind, target);

        if self.status == PlaybackStatus::Playing {
            self.excerpt_end = None;
            if let Err(err) = self.start_clock(target, None) {
                self.transition(PlaybackStatus::Ready);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Play `[start, end]` only, e.g. a question's proof interval
    ///
    /// Not a replay. When the excerpt finishes, playback rests at its end.
    pub fn play_excerpt(&mut self, start: f64, end: f64) -> Result<(), PlaybackError> {
        self.require(
            "play_excerpt",
            &[PlaybackStatus::Ready, PlaybackStatus::Playing],
        )?;
        for seconds in [start, end] {
            if !seconds.is_finite() {
                return Err(PlaybackError::InvalidPosition { seconds });
            }
        }

        let duration = self.duration();
        let start = start.clamp(0.0, duration);
        let end = end.clamp(start, duration);

        if let Err(err) = self.start_clock(start, Some(end - start)) {
            self.transition(PlaybackStatus::Ready);
            return Err(err);
        }
        self.position = start;
        self.paused_offset = start;
        self.excerpt_end = Some(end);
        self.transition(PlaybackStatus::Playing);
        Ok(())
    }

    /// Publish the clock's current time, handling the end of the emitter
    pub fn tick(&mut self) -> TickOutcome {
        if self.status != PlaybackStatus::Playing {
            return TickOutcome::Stopped;
        }
        let (now, end) = match (self.clock.now(), self.clock.scheduled_end()) {
            (Some(now), Some(end)) => (now, end),
            _ => return TickOutcome::Stopped,
        };

        if now >= end {
            self.finish_emitter(end);
            TickOutcome::Ended(self.position)
        } else {
            self.position = now.max(0.0);
            TickOutcome::Position(self.position)
        }
    }

    /// Completion signal from the output
    ///
    /// Only honoured when `id` is the emitter the clock currently owns; a
    /// late signal from a replaced emitter is dropped. Returns whether the
    /// completion was applied.
    pub fn on_emitter_complete(&mut self, id: EmitterId) -> bool {
        if self.status != PlaybackStatus::Playing || !self.clock.is_current(id) {
            log::debug!("[PlaybackController] Dropping stale completion for emitter {}", id.0);
            return false;
        }
        let end = self.clock.scheduled_end().unwrap_or_else(|| self.duration());
        self.finish_emitter(end);
        true
    }

    /// Pause if playing, then lock the session
    pub fn finalize(&mut self) -> Result<(), PlaybackError> {
        self.require(
            "finalize",
            &[PlaybackStatus::Ready, PlaybackStatus::Playing],
        )?;
        if self.status == PlaybackStatus::Playing {
            self.pause()?;
        }
        self.transition(PlaybackStatus::Submitted);
        Ok(())
    }

    /// Silence output before the controller is discarded
    pub fn teardown(&mut self) {
        self.clock.stop();
        self.excerpt_end = None;
    }

    fn require(
        &self,
        operation: &'static str,
        allowed: &[PlaybackStatus],
    ) -> Result<(), PlaybackError> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(PlaybackError::InvalidTransition {
                operation,
                status: self.status,
            })
        }
    }

    fn start_clock(&mut self, offset: f64, length: Option<f64>) -> Result<EmitterId, PlaybackError> {
        self.clock.begin(offset, length)
    }

    fn current_time(&self) -> f64 {
        let ceiling = self
            .clock
            .scheduled_end()
            .unwrap_or_else(|| self.duration());
        self.clock
            .now()
            .unwrap_or(self.position)
            .clamp(0.0, ceiling)
    }

    fn finish_emitter(&mut self, end: f64) {
        self.clock.stop();
        self.position = end;
        self.paused_offset = match self.excerpt_end.take() {
            Some(excerpt_end) if excerpt_end < self.duration() => excerpt_end,
            _ => 0.0,
        };
        self.transition(PlaybackStatus::Ready);
    }

    fn record(&mut self, kind: InteractionKind, audio_time: f64) {
        let wall_clock_ms = self.clock.time_source().wall_clock_ms();
        self.log.append(kind, audio_time, wall_clock_ms);
    }

    fn transition(&mut self, to: PlaybackStatus) {
        if self.status != to {
            log::debug!("[PlaybackController] {:?} -> {:?}", self.status, to);
            self.status = to;
        }
    }
}

#[cfg(test)]
mod tests;
