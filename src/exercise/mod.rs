//! Exercise data model
//!
//! An [`Exercise`] is the generated listening test: script, speakers and the
//! ordered questions with the audio interval where each answer is spoken.
//! It is immutable once a session is loaded.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

pub mod markers;
pub mod selection;

pub use markers::{format_clock, hint_markers, HintMarker};
pub use selection::{
    Level, QuestionType, Selection, SessionIdentity, StartRequest, TestPart, RANDOM_TOPIC,
};

/// Atomic question kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionKind {
    /// Sentence with a gap
    Sentence,
    /// Note or form line with a gap
    Note,
    /// Multiple choice
    Mcq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeakerRole {
    Clerk,
    Customer,
    Guide,
    Official,
    Student,
    Tutor,
    Professor,
    Lecturer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speaker {
    pub name: String,
    pub gender: Gender,
    pub role: SpeakerRole,
}

/// One spoken line of the script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptSegment {
    pub speaker_name: String,
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub answer: String,
    pub answer_sentence: String,
    pub timestamp_seconds: f64,
    pub proof_start: f64,
    pub proof_end: f64,
}

impl Question {
    /// Choices for a multiple-choice question, empty otherwise
    pub fn choices(&self) -> &[String] {
        match (self.kind, self.options.as_deref()) {
            (QuestionKind::Mcq, Some(options)) => options,
            _ => &[],
        }
    }

    /// Whether `option` is the canonical answer
    ///
    /// Matches either the full option text or its leading letter label
    /// ("B" for "B) Green").
    pub fn is_correct_option(&self, option: &str) -> bool {
        let option = option.trim();
        let answer = self.answer.trim();
        if option.eq_ignore_ascii_case(answer) {
            return true;
        }

        let mut chars = answer.chars();
        match (chars.next(), chars.next()) {
            (Some(letter), None) if letter.is_ascii_alphabetic() => {
                let mut option_chars = option.chars();
                matches!(
                    (option_chars.next(), option_chars.next()),
                    (Some(first), Some(')' | '.')) if first.eq_ignore_ascii_case(&letter)
                )
            }
            _ => false,
        }
    }

    /// Proof interval length in seconds
    pub fn proof_duration(&self) -> f64 {
        (self.proof_end - self.proof_start).max(0.0)
    }
}

/// Generated listening exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub title: String,
    pub part: TestPart,
    pub level: Level,
    pub instruction: String,
    pub script: String,
    pub script_segments: Vec<ScriptSegment>,
    pub speakers: Vec<Speaker>,
    pub questions: Vec<Question>,
}

/// Exercise as returned by the content generator, before part and level are
/// stamped onto it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedExercise {
    title: String,
    instruction: String,
    script: String,
    #[serde(default)]
    script_segments: Vec<ScriptSegment>,
    #[serde(default)]
    speakers: Vec<Speaker>,
    questions: Vec<Question>,
}

impl Exercise {
    /// Parse the generator's JSON payload and stamp the requested part/level
    ///
    /// # Errors
    /// `GenerationFailure` if the payload is not valid JSON for the schema or
    /// fails structural validation.
    pub fn from_generated_json(
        payload: &str,
        part: TestPart,
        level: Level,
    ) -> Result<Self, SessionError> {
        let generated: GeneratedExercise = serde_json::from_str(payload)?;
        let exercise = Self {
            title: generated.title,
            part,
            level,
            instruction: generated.instruction,
            script: generated.script,
            script_segments: generated.script_segments,
            speakers: generated.speakers,
            questions: generated.questions,
        };
        exercise.validate()?;
        Ok(exercise)
    }

    pub fn question(&self, id: u32) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == id)
    }

    pub fn question_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.questions.iter().map(|question| question.id)
    }

    /// Check structural invariants that do not depend on the audio track
    ///
    /// Question ids must run 1..=N in presentation order, proof intervals
    /// must be finite with `0 <= proof_start <= proof_end`, and
    /// multiple-choice questions must carry options.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.questions.is_empty() {
            return Err(invalid("exercise has no questions"));
        }

        for (index, question) in self.questions.iter().enumerate() {
            let expected = index as u32 + 1;
            if question.id != expected {
                return Err(invalid(format!(
                    "question at position {} has id {} (expected {})",
                    index + 1,
                    question.id,
                    expected
                )));
            }

            let interval_ok = question.proof_start.is_finite()
                && question.proof_end.is_finite()
                && question.proof_start >= 0.0
                && question.proof_start <= question.proof_end;
            if !interval_ok {
                return Err(invalid(format!(
                    "question {} has invalid proof interval [{}, {}]",
                    question.id, question.proof_start, question.proof_end
                )));
            }

            if question.kind == QuestionKind::Mcq && question.choices().is_empty() {
                return Err(invalid(format!(
                    "multiple-choice question {} has no options",
                    question.id
                )));
            }
        }

        Ok(())
    }

    /// Clamp every proof interval into `[0, duration]`
    ///
    /// Generated timestamps are estimates made before the audio exists, so
    /// they can overshoot the synthesized track.
    pub fn clamped_to_duration(mut self, duration: f64) -> Self {
        let duration = duration.max(0.0);
        for question in &mut self.questions {
            let start = question.proof_start.clamp(0.0, duration);
            let end = question.proof_end.clamp(start, duration);
            if start != question.proof_start || end != question.proof_end {
                log::warn!(
                    "[Exercise] Clamped proof interval of question {} from [{:.2}, {:.2}] to [{:.2}, {:.2}]",
                    question.id,
                    question.proof_start,
                    question.proof_end,
                    start,
                    end
                );
            }
            question.proof_start = start;
            question.proof_end = end;
            question.timestamp_seconds = question.timestamp_seconds.clamp(0.0, duration);
        }
        self
    }
}

fn invalid(reason: impl Into<String>) -> SessionError {
    SessionError::GenerationFailure {
        reason: reason.into(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn gap_question(id: u32, answer: &str, proof: (f64, f64)) -> Question {
        Question {
            id,
            kind: QuestionKind::Note,
            label: format!("Note {}", id),
            prefix: Some("Colour of the door:".to_string()),
            suffix: None,
            options: None,
            answer: answer.to_string(),
            answer_sentence: format!("The answer is {}.", answer),
            timestamp_seconds: proof.0,
            proof_start: proof.0,
            proof_end: proof.1,
        }
    }

    pub(crate) fn mcq_question(id: u32, answer: &str, proof: (f64, f64)) -> Question {
        Question {
            id,
            kind: QuestionKind::Mcq,
            label: "Which room is booked?".to_string(),
            prefix: None,
            suffix: None,
            options: Some(vec![
                "A) The library".to_string(),
                "B) The hall".to_string(),
                "C) The studio".to_string(),
                "D) The gym".to_string(),
            ]),
            answer: answer.to_string(),
            answer_sentence: "We'll take the hall, then.".to_string(),
            timestamp_seconds: proof.0,
            proof_start: proof.0,
            proof_end: proof.1,
        }
    }

    /// Two-question exercise used across the crate's unit tests
    pub(crate) fn sample_exercise() -> Exercise {
        Exercise {
            title: "Community Hall Booking".to_string(),
            part: TestPart::Part1,
            level: Level::Official,
            instruction: "Write ONE WORD ONLY for each answer.".to_string(),
            script: "Clerk: The door is blue. Customer: We'll take the hall.".to_string(),
            script_segments: vec![ScriptSegment {
                speaker_name: "Clerk".to_string(),
                text: "The door is blue.".to_string(),
                start_time: 0.0,
                end_time: 3.0,
            }],
            speakers: vec![Speaker {
                name: "Clerk".to_string(),
                gender: Gender::Female,
                role: SpeakerRole::Clerk,
            }],
            questions: vec![
                gap_question(1, "blue", (2.0, 3.0)),
                mcq_question(2, "B", (6.0, 7.5)),
            ],
        }
    }

    const GENERATED_PAYLOAD: &str = r#"{
        "title": "Gym Membership",
        "instruction": "Write NO MORE THAN TWO WORDS AND/OR A NUMBER for each answer.",
        "script": "Clerk: Welcome...",
        "scriptSegments": [
            { "speakerName": "Clerk", "text": "Welcome", "startTime": 0, "endTime": 1.5 }
        ],
        "speakers": [
            { "name": "Achernar", "gender": "female", "role": "clerk" },
            { "name": "Sadachbia", "gender": "male", "role": "customer" }
        ],
        "questions": [
            {
                "id": 1, "type": "NOTE", "label": "Surname", "prefix": "Name:",
                "answer": "Harper", "answerSentence": "It's Harper, H-A-R-P-E-R.",
                "timestampSeconds": 12.5, "proofStart": 11.0, "proofEnd": 14.0
            },
            {
                "id": 2, "type": "MCQ", "label": "Preferred time",
                "options": ["A) Morning", "B) Afternoon", "C) Evening"],
                "answer": "C", "answerSentence": "Evenings suit me best.",
                "timestampSeconds": 30, "proofStart": 29, "proofEnd": 31
            }
        ]
    }"#;

    #[test]
    fn test_parse_generated_payload_stamps_part_and_level() {
        let exercise =
            Exercise::from_generated_json(GENERATED_PAYLOAD, TestPart::Part3, Level::C1C2)
                .unwrap();
        assert_eq!(exercise.part, TestPart::Part3);
        assert_eq!(exercise.level, Level::C1C2);
        assert_eq!(exercise.questions.len(), 2);
        assert_eq!(exercise.questions[0].prefix.as_deref(), Some("Name:"));
        assert_eq!(exercise.questions[1].kind, QuestionKind::Mcq);
        assert_eq!(exercise.speakers[1].role, SpeakerRole::Customer);
    }

    #[test]
    fn test_parse_rejects_malformed_payload() {
        let result = Exercise::from_generated_json("{\"title\": 3}", TestPart::Part1, Level::A1A2);
        assert!(matches!(result, Err(SessionError::GenerationFailure { .. })));
    }

    #[test]
    fn test_validate_requires_contiguous_ids() {
        let mut exercise = sample_exercise();
        exercise.questions[1].id = 5;
        assert!(matches!(
            exercise.validate(),
            Err(SessionError::GenerationFailure { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_proof_interval() {
        let mut exercise = sample_exercise();
        exercise.questions[0].proof_start = 4.0;
        exercise.questions[0].proof_end = 3.0;
        assert!(exercise.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_mcq_without_options() {
        let mut exercise = sample_exercise();
        exercise.questions[1].options = None;
        assert!(exercise.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_any_question_count() {
        let mut exercise = sample_exercise();
        exercise.questions.push(gap_question(3, "tuesday", (8.0, 9.0)));
        assert!(exercise.validate().is_ok());
    }

    #[test]
    fn test_clamp_keeps_intervals_inside_track() {
        let mut exercise = sample_exercise();
        exercise.questions[1].proof_end = 42.0;
        exercise.questions[1].proof_start = 12.0;
        let clamped = exercise.clamped_to_duration(10.0);

        assert_eq!(clamped.questions[1].proof_start, 10.0);
        assert_eq!(clamped.questions[1].proof_end, 10.0);
        assert_eq!(clamped.questions[0].proof_end, 3.0);
    }

    #[test]
    fn test_correct_option_matches_letter_or_text() {
        let question = mcq_question(1, "B", (0.0, 1.0));
        assert!(question.is_correct_option("B) The hall"));
        assert!(!question.is_correct_option("A) The library"));

        let full = mcq_question(1, "C) The studio", (0.0, 1.0));
        assert!(full.is_correct_option("c) the studio"));
        assert!(!full.is_correct_option("B) The hall"));
    }
}
