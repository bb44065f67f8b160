// Error types for the listening tutor core
//
// This module defines custom error types for session and playback operations,
// providing structured error handling with stable error codes that a UI shell
// can map to its own messages.

mod playback;
mod session;

pub use playback::{log_playback_error, PlaybackError, PlaybackErrorCodes};
pub use session::{log_session_error, SessionError, SessionErrorCodes, USER_FACING_START_ERROR};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the boundary to the UI shell.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
