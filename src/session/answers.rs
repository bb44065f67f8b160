// Learner answers for one session

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::exercise::Exercise;

/// One entry per question, created empty when the exercise loads
///
/// Entries are never removed. Once locked at finalize, edits are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerSheet {
    answers: BTreeMap<u32, String>,
    locked: bool,
}

impl AnswerSheet {
    pub fn for_exercise(exercise: &Exercise) -> Self {
        Self {
            answers: exercise
                .question_ids()
                .map(|id| (id, String::new()))
                .collect(),
            locked: false,
        }
    }

    pub fn get(&self, question_id: u32) -> Option<&str> {
        self.answers.get(&question_id).map(String::as_str)
    }

    pub fn set(&mut self, question_id: u32, value: &str) -> Result<(), SessionError> {
        if self.locked {
            return Err(SessionError::AlreadySubmitted);
        }
        let entry = self
            .answers
            .get_mut(&question_id)
            .ok_or(SessionError::UnknownQuestion { question_id })?;
        *entry = value.to_string();
        Ok(())
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.answers.iter().map(|(id, value)| (*id, value.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::tests::sample_exercise;

    #[test]
    fn test_sheet_is_prefilled_empty() {
        let sheet = AnswerSheet::for_exercise(&sample_exercise());
        assert_eq!(sheet.len(), 2);
        assert!(sheet.iter().all(|(_, value)| value.is_empty()));
    }

    #[test]
    fn test_unknown_question_is_rejected() {
        let mut sheet = AnswerSheet::for_exercise(&sample_exercise());
        assert_eq!(
            sheet.set(9, "x"),
            Err(SessionError::UnknownQuestion { question_id: 9 })
        );
        assert_eq!(sheet.len(), 2);
    }

    #[test]
    fn test_locked_sheet_rejects_edits() {
        let mut sheet = AnswerSheet::for_exercise(&sample_exercise());
        sheet.set(1, "blue").unwrap();
        sheet.lock();
        assert_eq!(sheet.set(1, "red"), Err(SessionError::AlreadySubmitted));
        assert_eq!(sheet.get(1), Some("blue"));
    }
}
