// Session error types and constants

use crate::error::{ErrorCode, PlaybackError};
use log::error;
use std::fmt;

/// Message shown to the learner whenever a session cannot be initialized.
///
/// Generation and synthesis failures are never surfaced in detail; the UI
/// shell only ever shows this line.
pub const USER_FACING_START_ERROR: &str = "Unable to initialize test. Check your connection.";

/// Session error code constants
///
/// Single source of truth for the numeric codes surfaced to the UI shell.
///
/// Error code range: 3001-3011
pub struct SessionErrorCodes {}

impl SessionErrorCodes {
    /// Content generator rejected the request or returned unusable data
    pub const GENERATION_FAILURE: i32 = 3001;

    /// Audio synthesizer returned no usable audio payload
    pub const SYNTHESIS_FAILURE: i32 = 3002;

    /// Topic/part/level selection is not valid
    pub const INVALID_SELECTION: i32 = 3003;

    /// Question id does not exist in the current exercise
    pub const UNKNOWN_QUESTION: i32 = 3004;

    /// Session already finalized
    pub const ALREADY_SUBMITTED: i32 = 3005;

    /// No session has been loaded
    pub const NO_ACTIVE_SESSION: i32 = 3006;

    /// A session is loaded and not yet finalized
    pub const SESSION_IN_PROGRESS: i32 = 3007;

    /// A newer session start made this result moot
    pub const SUPERSEDED: i32 = 3008;

    /// Report renderer failed to produce its artifact
    pub const REPORT_FAILURE: i32 = 3009;

    /// Session state lock was poisoned
    pub const STATE_POISONED: i32 = 3010;

    /// Wrapped playback failure
    pub const PLAYBACK: i32 = 3011;
}

/// Log a session error with structured context
///
/// Logs the numeric code, the component and the human-readable message.
pub fn log_session_error(err: &SessionError, context: &str) {
    error!(
        "Session error in {}: code={}, component=SessionManager, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Session-related errors
///
/// These errors cover session start (generation and synthesis), answer
/// editing, assistance and report production.
///
/// Error code range: 3001-3011
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Content generator failed or produced an invalid exercise
    GenerationFailure { reason: String },

    /// Audio synthesizer failed to produce audio
    SynthesisFailure { reason: String },

    /// Selection inputs rejected before generation
    InvalidSelection { reason: String },

    /// Question id not present in the exercise
    UnknownQuestion { question_id: u32 },

    /// Session is submitted and no longer accepts edits
    AlreadySubmitted,

    /// No session is loaded
    NoActiveSession,

    /// A session is loaded and not finalized
    SessionInProgress,

    /// Result discarded because a newer session start superseded it
    Superseded { token: u64 },

    /// Report renderer failed
    ReportFailure { reason: String },

    /// Session state lock was poisoned
    StatePoisoned,

    /// Playback failure raised while driving the session
    Playback(PlaybackError),
}

impl SessionError {
    /// Whether this error belongs to the session-start boundary
    ///
    /// These are the failures that revert the manager to idle and surface
    /// [`USER_FACING_START_ERROR`].
    pub fn is_start_failure(&self) -> bool {
        matches!(
            self,
            SessionError::GenerationFailure { .. } | SessionError::SynthesisFailure { .. }
        )
    }
}

impl ErrorCode for SessionError {
    fn code(&self) -> i32 {
        match self {
            SessionError::GenerationFailure { .. } => SessionErrorCodes::GENERATION_FAILURE,
            SessionError::SynthesisFailure { .. } => SessionErrorCodes::SYNTHESIS_FAILURE,
            SessionError::InvalidSelection { .. } => SessionErrorCodes::INVALID_SELECTION,
            SessionError::UnknownQuestion { .. } => SessionErrorCodes::UNKNOWN_QUESTION,
            SessionError::AlreadySubmitted => SessionErrorCodes::ALREADY_SUBMITTED,
            SessionError::NoActiveSession => SessionErrorCodes::NO_ACTIVE_SESSION,
            SessionError::SessionInProgress => SessionErrorCodes::SESSION_IN_PROGRESS,
            SessionError::Superseded { .. } => SessionErrorCodes::SUPERSEDED,
            SessionError::ReportFailure { .. } => SessionErrorCodes::REPORT_FAILURE,
            SessionError::StatePoisoned => SessionErrorCodes::STATE_POISONED,
            SessionError::Playback(_) => SessionErrorCodes::PLAYBACK,
        }
    }

    fn message(&self) -> String {
        match self {
            SessionError::GenerationFailure { reason } => {
                format!("Content generation failed: {}", reason)
            }
            SessionError::SynthesisFailure { reason } => {
                format!("Audio synthesis failed: {}", reason)
            }
            SessionError::InvalidSelection { reason } => {
                format!("Invalid selection: {}", reason)
            }
            SessionError::UnknownQuestion { question_id } => {
                format!("Unknown question id {}", question_id)
            }
            SessionError::AlreadySubmitted => {
                "Session already submitted. Start a new session first.".to_string()
            }
            SessionError::NoActiveSession => {
                "No session loaded. Call start_session() first.".to_string()
            }
            SessionError::SessionInProgress => {
                "A session is in progress. Finalize it before starting another.".to_string()
            }
            SessionError::Superseded { token } => {
                format!("Session request {} superseded by a newer request", token)
            }
            SessionError::ReportFailure { reason } => {
                format!("Report rendering failed: {}", reason)
            }
            SessionError::StatePoisoned => "Session state lock poisoned".to_string(),
            SessionError::Playback(err) => err.message(),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SessionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SessionError {}

impl From<PlaybackError> for SessionError {
    fn from(err: PlaybackError) -> Self {
        SessionError::Playback(err)
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::GenerationFailure {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_codes() {
        assert_eq!(
            SessionError::GenerationFailure {
                reason: "test".to_string()
            }
            .code(),
            SessionErrorCodes::GENERATION_FAILURE
        );
        assert_eq!(
            SessionError::SynthesisFailure {
                reason: "test".to_string()
            }
            .code(),
            SessionErrorCodes::SYNTHESIS_FAILURE
        );
        assert_eq!(
            SessionError::UnknownQuestion { question_id: 11 }.code(),
            SessionErrorCodes::UNKNOWN_QUESTION
        );
        assert_eq!(
            SessionError::AlreadySubmitted.code(),
            SessionErrorCodes::ALREADY_SUBMITTED
        );
        assert_eq!(
            SessionError::Superseded { token: 2 }.code(),
            SessionErrorCodes::SUPERSEDED
        );
        assert_eq!(
            SessionError::StatePoisoned.code(),
            SessionErrorCodes::STATE_POISONED
        );
        assert_eq!(
            SessionError::Playback(PlaybackError::NoActiveEmitter).code(),
            SessionErrorCodes::PLAYBACK
        );
    }

    #[test]
    fn test_start_failure_classification() {
        assert!(SessionError::GenerationFailure {
            reason: "bad json".to_string()
        }
        .is_start_failure());
        assert!(SessionError::SynthesisFailure {
            reason: "no payload".to_string()
        }
        .is_start_failure());
        assert!(!SessionError::AlreadySubmitted.is_start_failure());
    }

    #[test]
    fn test_from_playback_error() {
        let err: SessionError = PlaybackError::NoActiveEmitter.into();
        assert!(matches!(
            err,
            SessionError::Playback(PlaybackError::NoActiveEmitter)
        ));
        assert!(err.message().contains("No audio emitter"));
    }

    #[test]
    fn test_from_json_error_is_generation_failure() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: SessionError = json_err.into();
        assert_eq!(err.code(), SessionErrorCodes::GENERATION_FAILURE);
    }

    #[test]
    fn test_error_propagation() {
        fn may_fail() -> Result<(), PlaybackError> {
            Err(PlaybackError::NoActiveEmitter)
        }

        fn caller() -> Result<(), SessionError> {
            may_fail()?;
            Ok(())
        }

        assert!(caller().is_err());
    }
}
