// Hint markers and clock formatting for the player timeline

use serde::{Deserialize, Serialize};

use super::Exercise;

/// Marker placed on the seek bar where a question's answer is spoken
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HintMarker {
    pub question_id: u32,
    /// Audio time at which the proof interval starts
    pub proof_start: f64,
    /// Position along the timeline (0.0 to 1.0)
    pub fraction: f64,
    /// Whether playback has already reached the proof interval
    pub passed: bool,
}

/// Build one marker per question for the current position
///
/// Returns no markers for a zero-length track.
pub fn hint_markers(exercise: &Exercise, duration: f64, position: f64) -> Vec<HintMarker> {
    if duration <= 0.0 {
        return Vec::new();
    }

    exercise
        .questions
        .iter()
        .map(|question| HintMarker {
            question_id: question.id,
            proof_start: question.proof_start,
            fraction: (question.proof_start / duration).clamp(0.0, 1.0),
            passed: position >= question.proof_start,
        })
        .collect()
}

/// Format audio seconds as `m:ss`
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::tests::sample_exercise;

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(9.99), "0:09");
        assert_eq!(format_clock(65.2), "1:05");
        assert_eq!(format_clock(-3.0), "0:00");
        assert_eq!(format_clock(f64::NAN), "0:00");
    }

    #[test]
    fn test_markers_track_position() {
        let exercise = sample_exercise();
        let markers = hint_markers(&exercise, 10.0, 3.0);

        assert_eq!(markers.len(), exercise.questions.len());
        assert_eq!(markers[0].question_id, 1);
        assert!((markers[0].fraction - 0.2).abs() < 1e-9);
        assert!(markers[0].passed);
        assert!(!markers[1].passed);
    }

    #[test]
    fn test_markers_empty_for_zero_duration() {
        assert!(hint_markers(&sample_exercise(), 0.0, 0.0).is_empty());
    }
}
