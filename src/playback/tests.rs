use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::*;
use crate::audio::AudioTrack;
use crate::engine::{ManualTimeSource, StubOutput, TimeSource};

struct Harness {
    controller: PlaybackController,
    output: Arc<StubOutput>,
    time: Arc<ManualTimeSource>,
    completions: mpsc::UnboundedReceiver<EmitterId>,
}

impl Harness {
    fn new(duration: f64) -> Self {
        let output = Arc::new(StubOutput::new());
        let time = Arc::new(ManualTimeSource::new());
        let track = Arc::new(AudioTrack::silent(duration, 100).unwrap());
        let (tx, completions) = mpsc::unbounded_channel();
        let clock = ClockSource::new(output.clone(), time.clone(), track, tx);
        Self {
            controller: PlaybackController::new(clock, 1.0),
            output,
            time,
            completions,
        }
    }

    fn advance(&self, seconds: f64) {
        self.time.advance(Duration::from_secs_f64(seconds));
    }

    /// Let the output finish the active emitter and deliver its completion
    fn complete_active(&mut self) -> bool {
        let id = self.output.active_id().unwrap();
        assert!(self.output.finish(id));
        let delivered = self.completions.try_recv().unwrap();
        self.controller.on_emitter_complete(delivered)
    }
}

#[test]
fn test_starts_ready_at_zero() {
    let harness = Harness::new(10.0);
    let snapshot = harness.controller.snapshot();
    assert_eq!(snapshot.status, PlaybackStatus::Ready);
    assert_eq!(snapshot.position, 0.0);
    assert_eq!(snapshot.duration, 10.0);
    assert_eq!(snapshot.replay_count, 0);
}

#[test]
fn test_replay_counter_is_monotonic() {
    let mut harness = Harness::new(10.0);
    let controller = &mut harness.controller;

    controller.play().unwrap();
    assert_eq!(controller.replay_count(), 1);

    harness.time.advance(Duration::from_secs(3));
    controller.pause().unwrap();
    controller.seek(0.4).unwrap();
    controller.play().unwrap();
    assert_eq!(controller.replay_count(), 2);

    harness.time.advance(Duration::from_secs(2));
    controller.pause().unwrap();
    controller.play().unwrap();
    assert_eq!(controller.replay_count(), 2);
}

#[test]
fn test_replay_event_is_logged_at_audio_zero() {
    let mut harness = Harness::new(10.0);
    harness.controller.seek(0.5).unwrap();
    harness.controller.play().unwrap();

    let replay = harness
        .controller
        .log()
        .iter()
        .find(|event| event.kind == InteractionKind::Replay)
        .copied()
        .unwrap();
    assert_eq!(replay.audio_time, 0.0);
}

#[test]
fn test_seek_never_counts_as_replay() {
    let mut harness = Harness::new(10.0);
    harness.controller.play().unwrap();
    harness.advance(4.0);
    harness.controller.seek(0.0).unwrap();
    harness.controller.seek(0.2).unwrap();

    assert_eq!(harness.controller.replay_count(), 1);
    assert_eq!(harness.controller.status(), PlaybackStatus::Playing);
}

#[test]
fn test_seek_tie_break_is_backward() {
    let mut harness = Harness::new(10.0);
    harness.controller.seek(5.0).unwrap();
    harness.controller.seek(5.0).unwrap();
    harness.controller.seek(5.5).unwrap();

    let kinds: Vec<_> = harness.controller.log().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            InteractionKind::SeekForward,
            InteractionKind::SeekBackward,
            InteractionKind::SeekForward,
        ]
    );
}

#[test]
fn test_seek_clamps_and_rejects_non_finite() {
    let mut harness = Harness::new(10.0);
    harness.controller.seek(42.0).unwrap();
    assert_eq!(harness.controller.position(), 10.0);
    harness.controller.seek(-3.0).unwrap();
    assert_eq!(harness.controller.position(), 0.0);

    let before = harness.controller.log().len();
    assert!(matches!(
        harness.controller.seek(f64::NAN),
        Err(PlaybackError::InvalidPosition { .. })
    ));
    assert_eq!(harness.controller.log().len(), before);
}

#[test]
fn test_seek_while_playing_restarts_clock_exclusively() {
    let mut harness = Harness::new(10.0);
    harness.controller.play().unwrap();
    let first = harness.controller.active_emitter().unwrap();

    harness.controller.seek(6.0).unwrap();
    let second = harness.controller.active_emitter().unwrap();

    assert_ne!(first, second);
    assert_eq!(harness.output.max_concurrent(), 1);
    assert_eq!(harness.output.started()[1].offset, 6.0);
}

#[test]
fn test_no_overlapping_emitters_across_operations() {
    let mut harness = Harness::new(10.0);
    let controller = &mut harness.controller;
    controller.play().unwrap();
    controller.seek(2.0).unwrap();
    controller.seek(8.0).unwrap();
    controller.play_excerpt(1.0, 2.0).unwrap();
    controller.pause().unwrap();
    controller.toggle().unwrap();

    assert_eq!(harness.output.max_concurrent(), 1);
    assert_eq!(harness.output.active_count(), 1);
}

#[test]
fn test_pause_records_elapsed_time() {
    let mut harness = Harness::new(10.0);
    harness.controller.play().unwrap();
    harness.advance(3.0);
    harness.controller.pause().unwrap();

    assert_eq!(harness.controller.status(), PlaybackStatus::Ready);
    assert!((harness.controller.paused_offset() - 3.0).abs() < 1e-9);
    let pause = harness.controller.log().events()[1];
    assert_eq!(pause.kind, InteractionKind::Pause);
    assert!((pause.audio_time - 3.0).abs() < 1e-9);
    assert_eq!(harness.output.active_count(), 0);
}

#[test]
fn test_tick_publishes_position() {
    let mut harness = Harness::new(10.0);
    harness.controller.play().unwrap();
    harness.advance(2.5);

    match harness.controller.tick() {
        TickOutcome::Position(position) => assert!((position - 2.5).abs() < 1e-9),
        other => panic!("unexpected tick outcome {:?}", other),
    }
}

#[test]
fn test_tick_handles_end_of_track() {
    let mut harness = Harness::new(10.0);
    harness.controller.seek(8.0).unwrap();
    harness.controller.play().unwrap();
    harness.advance(5.0);

    assert_eq!(harness.controller.tick(), TickOutcome::Ended(10.0));
    let snapshot = harness.controller.snapshot();
    assert_eq!(snapshot.status, PlaybackStatus::Ready);
    assert_eq!(snapshot.position, 10.0);
    assert_eq!(snapshot.paused_offset, 0.0);
    assert_eq!(harness.output.active_count(), 0);
    assert_eq!(harness.controller.tick(), TickOutcome::Stopped);
}

#[test]
fn test_pause_after_end_before_tick_is_a_stop() {
    let mut harness = Harness::new(10.0);
    harness.controller.seek(9.5).unwrap();
    harness.controller.play().unwrap();
    harness.advance(2.0);

    harness.controller.pause().unwrap();
    let snapshot = harness.controller.snapshot();
    assert_eq!(snapshot.status, PlaybackStatus::Ready);
    assert_eq!(snapshot.position, 10.0);
    assert_eq!(snapshot.paused_offset, 0.0);
    assert_eq!(harness.controller.log().count(InteractionKind::Pause), 0);
    assert_eq!(harness.output.active_count(), 0);

    // One press of play starts the track over
    harness.controller.play().unwrap();
    assert_eq!(harness.controller.position(), 0.0);
    assert_eq!(harness.controller.replay_count(), 1);
}

#[test]
fn test_play_after_natural_end_restarts_as_replay() {
    let mut harness = Harness::new(10.0);
    harness.controller.play().unwrap();
    harness.advance(3.0);
    harness.controller.pause().unwrap();
    harness.controller.seek(7.0).unwrap();
    harness.controller.play().unwrap();
    assert_eq!(harness.controller.replay_count(), 1);

    harness.advance(3.0);
    assert_eq!(harness.controller.tick(), TickOutcome::Ended(10.0));
    assert_eq!(harness.controller.paused_offset(), 0.0);

    harness.controller.play().unwrap();
    assert_eq!(harness.controller.position(), 0.0);
    assert_eq!(harness.controller.replay_count(), 2);
    assert_eq!(harness.output.started().last().unwrap().offset, 0.0);
}

#[test]
fn test_completion_handles_end_of_track() {
    let mut harness = Harness::new(10.0);
    harness.controller.seek(7.0).unwrap();
    harness.controller.play().unwrap();
    harness.advance(3.0);

    assert!(harness.complete_active());
    assert_eq!(harness.controller.status(), PlaybackStatus::Ready);
    assert_eq!(harness.controller.position(), 10.0);
    assert_eq!(harness.controller.paused_offset(), 0.0);
}

#[test]
fn test_stale_completion_is_ignored() {
    let mut harness = Harness::new(10.0);
    harness.controller.play().unwrap();
    let stale = harness.controller.active_emitter().unwrap();
    harness.controller.seek(5.0).unwrap();

    assert!(!harness.controller.on_emitter_complete(stale));
    assert_eq!(harness.controller.status(), PlaybackStatus::Playing);
    assert!(harness.controller.active_emitter().is_some());
}

#[test]
fn test_excerpt_rests_at_its_end() {
    let mut harness = Harness::new(10.0);
    harness.controller.play_excerpt(2.0, 3.5).unwrap();
    assert_eq!(harness.controller.status(), PlaybackStatus::Playing);
    assert_eq!(harness.output.started()[0].end, 3.5);

    harness.advance(1.5);
    assert_eq!(harness.controller.tick(), TickOutcome::Ended(3.5));
    assert_eq!(harness.controller.paused_offset(), 3.5);
    assert_eq!(harness.controller.replay_count(), 0);
    assert!(harness.controller.log().is_empty());
}

#[test]
fn test_pause_during_excerpt_stays_within_excerpt() {
    let mut harness = Harness::new(10.0);
    harness.controller.play_excerpt(2.0, 3.0).unwrap();
    harness.advance(0.5);
    harness.controller.pause().unwrap();
    assert!((harness.controller.paused_offset() - 2.5).abs() < 1e-9);
}

#[test]
fn test_toggle_alternates() {
    let mut harness = Harness::new(10.0);
    harness.controller.toggle().unwrap();
    assert_eq!(harness.controller.status(), PlaybackStatus::Playing);
    harness.controller.toggle().unwrap();
    assert_eq!(harness.controller.status(), PlaybackStatus::Ready);
}

#[test]
fn test_invalid_transitions_leave_state_untouched() {
    let mut harness = Harness::new(10.0);
    assert_eq!(
        harness.controller.pause(),
        Err(PlaybackError::InvalidTransition {
            operation: "pause",
            status: PlaybackStatus::Ready,
        })
    );
    harness.controller.play().unwrap();
    assert!(harness.controller.play().is_err());
    assert_eq!(harness.controller.status(), PlaybackStatus::Playing);
    assert_eq!(harness.controller.replay_count(), 1);
}

#[test]
fn test_finalize_is_irrevocable() {
    let mut harness = Harness::new(10.0);
    harness.controller.play().unwrap();
    harness.advance(1.0);
    harness.controller.finalize().unwrap();
    assert_eq!(harness.controller.status(), PlaybackStatus::Submitted);
    assert_eq!(harness.output.active_count(), 0);
    assert_eq!(harness.controller.log().count(InteractionKind::Pause), 1);

    assert!(harness.controller.play().is_err());
    assert!(harness.controller.pause().is_err());
    assert!(harness.controller.seek(4.0).is_err());
    assert!(harness.controller.toggle().is_err());
    assert!(harness.controller.play_excerpt(1.0, 2.0).is_err());
    assert!(harness.controller.finalize().is_err());
    assert_eq!(harness.controller.status(), PlaybackStatus::Submitted);
}

#[test]
fn test_failed_start_keeps_ready() {
    let mut harness = Harness::new(10.0);
    harness.output.fail_next_start();
    assert!(matches!(
        harness.controller.play(),
        Err(PlaybackError::PlaybackFailure { .. })
    ));
    assert_eq!(harness.controller.status(), PlaybackStatus::Ready);
    assert_eq!(harness.controller.replay_count(), 0);
}

#[test]
fn test_event_timestamps_follow_wall_clock() {
    let mut harness = Harness::new(10.0);
    let start = harness.time.wall_clock_ms();
    harness.controller.play().unwrap();
    harness.advance(2.0);
    harness.controller.pause().unwrap();

    let events = harness.controller.log().events();
    assert_eq!(events[0].wall_clock_ms, start);
    assert_eq!(events[1].wall_clock_ms, start + 2_000);
}
