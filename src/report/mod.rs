//! Scoring and report assembly
//!
//! Everything here is pure: the same exercise, answers, log and ledger
//! always produce the same [`ReportInput`]. Rendering the input into an
//! artifact is left to a [`ReportRenderer`].

mod renderer;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analytics::{
    AssistanceLedger, AssistanceRecord, InteractionEvent, InteractionKind, InteractionLog,
};
use crate::config::ReportConfig;
use crate::exercise::{Exercise, Level, SessionIdentity, TestPart};
use crate::session::AnswerSheet;

pub use renderer::{write_report, JsonReportRenderer, ReportRenderer};

pub const HIGH_ASSISTANCE_ADVICE: &str =
    "High assistance used. Try reducing reliance on script/50-50 tools.";
pub const INDEPENDENT_ADVICE: &str = "Excellent independent listening performance.";

/// Outcome for one question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_id: u32,
    pub label: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub assistance: AssistanceRecord,
    pub assistance_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub correct: usize,
    pub total: usize,
    pub questions: Vec<QuestionResult>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionSummary {
    pub replays: usize,
    pub pauses: usize,
    pub seek_forward: usize,
    pub seek_backward: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub interactions: InteractionSummary,
    pub events: Vec<InteractionEvent>,
    /// Only questions that received help
    pub assistance: BTreeMap<u32, AssistanceRecord>,
    pub assisted_questions: usize,
    pub advice: String,
}

/// Everything a renderer needs to produce the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportInput {
    pub student: String,
    pub test_number: String,
    pub title: String,
    pub part: TestPart,
    pub level: Level,
    pub score: ScoreSummary,
    pub analytics: AnalyticsSummary,
    pub file_name: String,
}

/// Whether `answer` matches `expected` after trimming, ignoring case
pub fn answers_match(answer: &str, expected: &str) -> bool {
    answer.trim().to_lowercase() == expected.trim().to_lowercase()
}

/// Score every question; unanswered questions count as wrong
pub fn score(exercise: &Exercise, answers: &AnswerSheet, ledger: &AssistanceLedger) -> ScoreSummary {
    let questions: Vec<QuestionResult> = exercise
        .questions
        .iter()
        .map(|question| {
            let user_answer = answers.get(question.id).unwrap_or_default().to_string();
            let assistance = ledger.record(question.id);
            QuestionResult {
                question_id: question.id,
                label: question.label.clone(),
                is_correct: answers_match(&user_answer, &question.answer),
                user_answer,
                correct_answer: question.answer.clone(),
                assistance,
                assistance_label: assistance.label().to_string(),
            }
        })
        .collect();

    ScoreSummary {
        correct: questions.iter().filter(|result| result.is_correct).count(),
        total: questions.len(),
        questions,
    }
}

pub fn summarize(log: &InteractionLog) -> InteractionSummary {
    InteractionSummary {
        replays: log.replay_count(),
        pauses: log.count(InteractionKind::Pause),
        seek_forward: log.count(InteractionKind::SeekForward),
        seek_backward: log.count(InteractionKind::SeekBackward),
    }
}

pub fn advice(assisted_questions: usize, config: &ReportConfig) -> &'static str {
    if assisted_questions > config.high_assistance_threshold {
        HIGH_ASSISTANCE_ADVICE
    } else {
        INDEPENDENT_ADVICE
    }
}

/// `IELTS_Report_<name>.pdf` with runs of whitespace and path separators
/// collapsed to `_`
pub fn report_file_name(display_name: &str) -> String {
    let name = display_name
        .split(|c: char| c.is_whitespace() || c == '/' || c == '\\')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    format!("IELTS_Report_{}.pdf", name)
}

pub fn assemble_report(
    exercise: &Exercise,
    answers: &AnswerSheet,
    log: &InteractionLog,
    ledger: &AssistanceLedger,
    identity: &SessionIdentity,
    config: &ReportConfig,
) -> ReportInput {
    let assisted_questions = ledger.assisted_count();

    ReportInput {
        student: identity.display_name.clone(),
        test_number: identity.test_number.clone(),
        title: exercise.title.clone(),
        part: exercise.part,
        level: exercise.level,
        score: score(exercise, answers, ledger),
        analytics: AnalyticsSummary {
            interactions: summarize(log),
            events: log.events().to_vec(),
            assistance: ledger.iter().collect(),
            assisted_questions,
            advice: advice(assisted_questions, config).to_string(),
        },
        file_name: report_file_name(&identity.display_name),
    }
}
