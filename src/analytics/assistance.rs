// Assistance ledger and 50/50 option elimination

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::exercise::{Question, QuestionKind};

/// Help a learner can ask for on a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistanceMechanism {
    /// 50/50: hide all but two options
    Lifeline,
    /// Reveal the transcript excerpt holding the answer
    Script,
}

/// Per-question assistance flags; both false when nothing was used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistanceRecord {
    pub lifeline: bool,
    pub script: bool,
}

impl AssistanceRecord {
    pub fn is_assisted(&self) -> bool {
        self.lifeline || self.script
    }

    /// Label printed in the report's assistance column
    pub fn label(&self) -> &'static str {
        match (self.lifeline, self.script) {
            (true, true) => "50/50+SCRIPT",
            (true, false) => "50/50",
            (false, true) => "SCRIPT",
            (false, false) => "NONE",
        }
    }
}

/// Monotonic record of which questions received help
///
/// Flags only ever go from false to true. Once sealed at finalize, further
/// marks are ignored.
#[derive(Debug, Clone, Default)]
pub struct AssistanceLedger {
    records: BTreeMap<u32, AssistanceRecord>,
    sealed: bool,
}

impl AssistanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record use of `mechanism` on `question_id`
    ///
    /// Returns true when the flag changed.
    pub fn mark_used(&mut self, question_id: u32, mechanism: AssistanceMechanism) -> bool {
        if self.sealed {
            log::debug!(
                "[AssistanceLedger] Ignoring {:?} on question {} after submission",
                mechanism,
                question_id
            );
            return false;
        }

        let record = self.records.entry(question_id).or_default();
        let flag = match mechanism {
            AssistanceMechanism::Lifeline => &mut record.lifeline,
            AssistanceMechanism::Script => &mut record.script,
        };
        let changed = !*flag;
        *flag = true;
        changed
    }

    pub fn record(&self, question_id: u32) -> AssistanceRecord {
        self.records.get(&question_id).copied().unwrap_or_default()
    }

    /// Number of questions with any assistance
    pub fn assisted_count(&self) -> usize {
        self.records
            .values()
            .filter(|record| record.is_assisted())
            .count()
    }

    /// Records for questions that received help, ordered by question id
    pub fn iter(&self) -> impl Iterator<Item = (u32, AssistanceRecord)> + '_ {
        self.records
            .iter()
            .filter(|(_, record)| record.is_assisted())
            .map(|(id, record)| (*id, *record))
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }
}

/// Pick the options the 50/50 lifeline hides
///
/// Hides `choices - 2` wrong options at random, never the correct one.
/// Returned in presentation order. Non-multiple-choice questions hide nothing.
pub fn lifeline_hidden_options<R: Rng + ?Sized>(question: &Question, rng: &mut R) -> Vec<String> {
    if question.kind != QuestionKind::Mcq {
        return Vec::new();
    }

    let choices = question.choices();
    let mut wrong: Vec<&String> = choices
        .iter()
        .filter(|option| !question.is_correct_option(option))
        .collect();
    let hide = choices.len().saturating_sub(2).min(wrong.len());

    wrong.shuffle(rng);
    let hidden: Vec<&String> = wrong.into_iter().take(hide).collect();

    choices
        .iter()
        .filter(|option| hidden.contains(option))
        .cloned()
        .collect()
}
