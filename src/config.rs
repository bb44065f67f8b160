//! Configuration management for the listening tutor core
//!
//! This module provides runtime configuration loading from JSON files so
//! polling cadence, replay detection and report wording can be tuned
//! without recompilation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorConfig {
    pub playback: PlaybackConfig,
    pub session: SessionConfig,
    pub report: ReportConfig,
    pub telemetry: TelemetryConfig,
}

/// Playback controller parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Interval between position publications while playing
    pub poll_interval_ms: u64,
    /// A `play()` starting below this offset counts as a replay
    pub replay_threshold_secs: f64,
    /// Capacity of the position/status broadcast channels
    pub broadcast_capacity: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            replay_threshold_secs: 1.0,
            broadcast_capacity: 64,
        }
    }
}

/// Session defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Display name used when the learner leaves the field blank
    pub default_display_name: String,
    /// Test number used when the learner leaves the field blank
    pub default_test_number: String,
    /// Fixed seed for lifeline option elimination (random when absent)
    pub lifeline_seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_display_name: "Student".to_string(),
            default_test_number: "1".to_string(),
            lifeline_seed: None,
        }
    }
}

/// Report assembly parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// More assisted questions than this triggers the high-assistance advice
    pub high_assistance_threshold: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            high_assistance_threshold: 2,
        }
    }
}

/// Telemetry hub sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub channel_capacity: usize,
    pub history_capacity: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            history_capacity: 64,
        }
    }
}

impl TutorConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults if the file is missing or
    /// its JSON is invalid.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default asset location
    pub fn load() -> Self {
        Self::load_from_file("assets/tutor_config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TutorConfig::default();
        assert_eq!(config.playback.poll_interval_ms, 50);
        assert_eq!(config.playback.replay_threshold_secs, 1.0);
        assert_eq!(config.session.default_test_number, "1");
        assert_eq!(config.report.high_assistance_threshold, 2);
        assert!(config.session.lifeline_seed.is_none());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = TutorConfig::default();
        config.session.lifeline_seed = Some(7);
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: TutorConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.session.lifeline_seed, Some(7));
        assert_eq!(
            parsed.playback.poll_interval_ms,
            config.playback.poll_interval_ms
        );
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let parsed: TutorConfig =
            serde_json::from_str(r#"{ "playback": { "poll_interval_ms": 20 } }"#).unwrap();
        assert_eq!(parsed.playback.poll_interval_ms, 20);
        assert_eq!(parsed.playback.replay_threshold_secs, 1.0);
        assert_eq!(parsed.session.default_display_name, "Student");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = TutorConfig::load_from_file("/nonexistent/tutor_config.json");
        assert_eq!(config.playback.poll_interval_ms, 50);
    }

    #[test]
    fn test_bundled_asset_matches_defaults() {
        let config = TutorConfig::load_from_file(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/assets/tutor_config.json"
        ));
        let defaults = TutorConfig::default();
        assert_eq!(config.playback.poll_interval_ms, defaults.playback.poll_interval_ms);
        assert_eq!(
            config.session.default_display_name,
            defaults.session.default_display_name
        );
        assert_eq!(config.telemetry.history_capacity, defaults.telemetry.history_capacity);
    }
}
