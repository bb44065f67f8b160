// Interaction event log

use serde::{Deserialize, Serialize};

/// Kind of learner interaction with the audio timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Replay,
    Pause,
    SeekForward,
    SeekBackward,
}

/// One interaction, stamped with both clocks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub kind: InteractionKind,
    /// Audio time (seconds) the interaction applies to
    pub audio_time: f64,
    /// Milliseconds since the Unix epoch
    pub wall_clock_ms: u64,
}

/// Append-only interaction log
///
/// The replay count is derived from the log rather than kept separately,
/// so the two can never disagree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionLog {
    events: Vec<InteractionEvent>,
}

impl InteractionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, kind: InteractionKind, audio_time: f64, wall_clock_ms: u64) {
        self.events.push(InteractionEvent {
            kind,
            audio_time,
            wall_clock_ms,
        });
    }

    pub fn events(&self) -> &[InteractionEvent] {
        &self.events
    }

    pub fn iter(&self) -> impl Iterator<Item = &InteractionEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn count(&self, kind: InteractionKind) -> usize {
        self.events.iter().filter(|event| event.kind == kind).count()
    }

    pub fn replay_count(&self) -> usize {
        self.count(InteractionKind::Replay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_kind() {
        let mut log = InteractionLog::new();
        log.append(InteractionKind::Replay, 0.0, 10);
        log.append(InteractionKind::Pause, 4.2, 20);
        log.append(InteractionKind::SeekForward, 8.0, 30);
        log.append(InteractionKind::Replay, 0.0, 40);

        assert_eq!(log.len(), 4);
        assert_eq!(log.replay_count(), 2);
        assert_eq!(log.count(InteractionKind::Pause), 1);
        assert_eq!(log.count(InteractionKind::SeekBackward), 0);
    }

    #[test]
    fn test_iteration_preserves_append_order() {
        let mut log = InteractionLog::new();
        log.append(InteractionKind::SeekBackward, 1.0, 5);
        log.append(InteractionKind::Pause, 2.0, 6);

        let kinds: Vec<_> = log.iter().map(|event| event.kind).collect();
        assert_eq!(
            kinds,
            vec![InteractionKind::SeekBackward, InteractionKind::Pause]
        );
    }

    #[test]
    fn test_event_wire_format() {
        let event = InteractionEvent {
            kind: InteractionKind::SeekForward,
            audio_time: 3.5,
            wall_clock_ms: 99,
        };
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["kind"], "seek_forward");
        assert_eq!(json["wall_clock_ms"], 99);
    }
}
