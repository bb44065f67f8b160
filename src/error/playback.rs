// Playback error types and constants

use crate::error::ErrorCode;
use crate::playback::PlaybackStatus;
use log::error;
use std::fmt;

/// Playback error code constants
///
/// Single source of truth for the numeric codes surfaced to the UI shell.
///
/// Error code range: 4001-4005
pub struct PlaybackErrorCodes {}

impl PlaybackErrorCodes {
    /// Emitter creation or start failed on the audio output
    pub const PLAYBACK_FAILURE: i32 = 4001;

    /// Operation is not valid in the current playback status
    pub const INVALID_TRANSITION: i32 = 4002;

    /// Requested audio position is not a finite number
    pub const INVALID_POSITION: i32 = 4003;

    /// Operation needs an active emitter and there is none
    pub const NO_ACTIVE_EMITTER: i32 = 4004;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 4005;
}

/// Log a playback error with structured context
///
/// Logs the numeric code, the component and the human-readable message.
pub fn log_playback_error(err: &PlaybackError, context: &str) {
    error!(
        "Playback error in {}: code={}, component=PlaybackController, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Playback-related errors
///
/// These errors cover the clock source, the audio output backend and the
/// playback state machine.
///
/// Error code range: 4001-4005
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// Audio output could not create or start an emitter
    PlaybackFailure { reason: String },

    /// Operation attempted in a status where it is not allowed
    InvalidTransition {
        operation: &'static str,
        status: PlaybackStatus,
    },

    /// Position is NaN or infinite
    InvalidPosition { seconds: f64 },

    /// No emitter is currently active
    NoActiveEmitter,

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },
}

impl ErrorCode for PlaybackError {
    fn code(&self) -> i32 {
        match self {
            PlaybackError::PlaybackFailure { .. } => PlaybackErrorCodes::PLAYBACK_FAILURE,
            PlaybackError::InvalidTransition { .. } => PlaybackErrorCodes::INVALID_TRANSITION,
            PlaybackError::InvalidPosition { .. } => PlaybackErrorCodes::INVALID_POSITION,
            PlaybackError::NoActiveEmitter => PlaybackErrorCodes::NO_ACTIVE_EMITTER,
            PlaybackError::LockPoisoned { .. } => PlaybackErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            PlaybackError::PlaybackFailure { reason } => {
                format!("Audio playback failed: {}", reason)
            }
            PlaybackError::InvalidTransition { operation, status } => {
                format!("Cannot {} while playback is {:?}", operation, status)
            }
            PlaybackError::InvalidPosition { seconds } => {
                format!("Invalid playback position: {}", seconds)
            }
            PlaybackError::NoActiveEmitter => "No audio emitter is active".to_string(),
            PlaybackError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
        }
    }
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PlaybackError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for PlaybackError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_error_codes() {
        assert_eq!(
            PlaybackError::PlaybackFailure {
                reason: "test".to_string()
            }
            .code(),
            PlaybackErrorCodes::PLAYBACK_FAILURE
        );
        assert_eq!(
            PlaybackError::InvalidTransition {
                operation: "pause",
                status: PlaybackStatus::Ready,
            }
            .code(),
            PlaybackErrorCodes::INVALID_TRANSITION
        );
        assert_eq!(
            PlaybackError::InvalidPosition { seconds: f64::NAN }.code(),
            PlaybackErrorCodes::INVALID_POSITION
        );
        assert_eq!(
            PlaybackError::NoActiveEmitter.code(),
            PlaybackErrorCodes::NO_ACTIVE_EMITTER
        );
        assert_eq!(
            PlaybackError::LockPoisoned {
                component: "session".to_string()
            }
            .code(),
            PlaybackErrorCodes::LOCK_POISONED
        );
    }

    #[test]
    fn test_invalid_transition_message_names_operation_and_status() {
        let err = PlaybackError::InvalidTransition {
            operation: "seek",
            status: PlaybackStatus::Submitted,
        };
        assert_eq!(err.message(), "Cannot seek while playback is Submitted");
    }

    #[test]
    fn test_playback_error_display() {
        let err = PlaybackError::NoActiveEmitter;
        let display = format!("{}", err);
        assert!(display.contains("PlaybackError"));
        assert!(display.contains("4004"));
    }
}
