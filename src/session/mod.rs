//! Session container
//!
//! A [`Session`] owns every entity scoped to one attempt at an exercise:
//! the exercise itself, the answer sheet, the playback controller (and with
//! it the clock and interaction log), the assistance ledger and the lifeline
//! selections. Starting a new session replaces the whole value at once, so
//! nothing from a previous attempt can leak into the next.

mod answers;
pub mod collaborators;

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::analytics::{lifeline_hidden_options, AssistanceLedger, AssistanceMechanism};
use crate::config::ReportConfig;
use crate::error::SessionError;
use crate::exercise::{hint_markers, Exercise, HintMarker, Question, SessionIdentity};
use crate::playback::{PlaybackController, PlaybackStatus};
use crate::report::{assemble_report, ReportInput};

pub use answers::AnswerSheet;
pub use collaborators::{AudioSynthesizer, ContentGenerator};

/// Transcript excerpt shown when the learner reveals the script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptReveal {
    pub question_id: u32,
    pub answer_sentence: String,
    pub proof_start: f64,
    pub proof_end: f64,
}

pub struct Session {
    token: u64,
    exercise: Arc<Exercise>,
    answers: AnswerSheet,
    playback: PlaybackController,
    ledger: AssistanceLedger,
    lifelines: HashMap<u32, Vec<String>>,
    rng: StdRng,
    identity: SessionIdentity,
    report_config: ReportConfig,
}

impl Session {
    pub fn new(
        token: u64,
        exercise: Arc<Exercise>,
        playback: PlaybackController,
        identity: SessionIdentity,
        lifeline_seed: Option<u64>,
        report_config: ReportConfig,
    ) -> Self {
        let rng = match lifeline_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            token,
            answers: AnswerSheet::for_exercise(&exercise),
            exercise,
            playback,
            ledger: AssistanceLedger::new(),
            lifelines: HashMap::new(),
            rng,
            identity,
            report_config,
        }
    }

    /// Token of the start request that produced this session
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn exercise(&self) -> &Arc<Exercise> {
        &self.exercise
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    pub fn ledger(&self) -> &AssistanceLedger {
        &self.ledger
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn playback_mut(&mut self) -> &mut PlaybackController {
        &mut self.playback
    }

    pub fn status(&self) -> PlaybackStatus {
        self.playback.status()
    }

    pub fn is_submitted(&self) -> bool {
        self.status() == PlaybackStatus::Submitted
    }

    fn question(&self, question_id: u32) -> Result<&Question, SessionError> {
        self.exercise
            .question(question_id)
            .ok_or(SessionError::UnknownQuestion { question_id })
    }

    pub fn set_answer(&mut self, question_id: u32, value: &str) -> Result<(), SessionError> {
        self.answers.set(question_id, value)
    }

    /// Apply the 50/50 lifeline and return the options it hides
    ///
    /// The hidden options are chosen once per question; asking again returns
    /// the same selection.
    pub fn use_lifeline(&mut self, question_id: u32) -> Result<Vec<String>, SessionError> {
        if self.is_submitted() {
            return Err(SessionError::AlreadySubmitted);
        }
        let exercise = Arc::clone(&self.exercise);
        let question = exercise
            .question(question_id)
            .ok_or(SessionError::UnknownQuestion { question_id })?;

        let rng = &mut self.rng;
        let hidden = self
            .lifelines
            .entry(question_id)
            .or_insert_with(|| lifeline_hidden_options(question, rng))
            .clone();

        if self
            .ledger
            .mark_used(question_id, AssistanceMechanism::Lifeline)
        {
            log::info!("[Session] Lifeline used on question {}", question_id);
        }
        Ok(hidden)
    }

    /// Options hidden by a lifeline on this question, if one was used
    pub fn hidden_options(&self, question_id: u32) -> &[String] {
        self.lifelines
            .get(&question_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Reveal the transcript proof for a question
    ///
    /// Still available after submission for review, but only recorded as
    /// assistance before it.
    pub fn reveal_script(&mut self, question_id: u32) -> Result<ScriptReveal, SessionError> {
        let question = self.question(question_id)?;
        let reveal = ScriptReveal {
            question_id,
            answer_sentence: question.answer_sentence.clone(),
            proof_start: question.proof_start,
            proof_end: question.proof_end,
        };

        if !self.is_submitted()
            && self
                .ledger
                .mark_used(question_id, AssistanceMechanism::Script)
        {
            log::info!("[Session] Script revealed for question {}", question_id);
        }
        Ok(reveal)
    }

    /// Play the question's proof interval
    pub fn play_proof(&mut self, question_id: u32) -> Result<(), SessionError> {
        let (start, end) = {
            let question = self.question(question_id)?;
            (question.proof_start, question.proof_end)
        };
        self.playback.play_excerpt(start, end)?;
        Ok(())
    }

    pub fn hint_markers(&self) -> Vec<HintMarker> {
        hint_markers(
            &self.exercise,
            self.playback.duration(),
            self.playback.position(),
        )
    }

    /// Lock the session: stop playback, seal the ledger and the answers
    pub fn finalize(&mut self) -> Result<(), SessionError> {
        if self.is_submitted() {
            return Err(SessionError::AlreadySubmitted);
        }
        self.playback.finalize()?;
        self.ledger.seal();
        self.answers.lock();
        Ok(())
    }

    /// Assemble the report input; only available once submitted
    pub fn report(&self) -> Result<ReportInput, SessionError> {
        if !self.is_submitted() {
            return Err(SessionError::SessionInProgress);
        }
        Ok(assemble_report(
            &self.exercise,
            &self.answers,
            self.playback.log(),
            &self.ledger,
            &self.identity,
            &self.report_config,
        ))
    }

    pub fn teardown(&mut self) {
        self.playback.teardown();
    }
}
