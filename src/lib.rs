// Listening Tutor Core - Playback and Analytics Engine
// Session lifecycle, audio clock and learner analytics for listening tests

// Module declarations
pub mod analytics;
pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod exercise;
pub mod fixtures;
pub mod managers;
pub mod playback;
pub mod report;
pub mod session;
pub mod telemetry;

// Re-exports for convenience
pub use config::TutorConfig;
pub use error::{ErrorCode, PlaybackError, SessionError, USER_FACING_START_ERROR};
pub use exercise::{Exercise, Selection, SessionIdentity, StartRequest};
pub use managers::{SessionBackends, SessionManager};
pub use playback::{PlaybackSnapshot, PlaybackStatus};
pub use report::ReportInput;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        let config = TutorConfig::default();
        assert_eq!(config.playback.poll_interval_ms, 50);
        assert_eq!(PlaybackStatus::default(), PlaybackStatus::Idle);
    }
}
