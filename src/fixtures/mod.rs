//! Fixture utilities for the deterministic CLI harness.
//!
//! This module discovers exercise fixtures on disk and exposes file-backed
//! implementations of the session collaborators, so a full session can run
//! without the remote generator or speech synthesizer. A fixture is a
//! generator JSON payload (`<name>.json`) with an optional recorded track
//! next to it (`<name>.wav`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use futures::future::BoxFuture;

use crate::audio::{AudioTrack, SYNTHESIS_SAMPLE_RATE};
use crate::error::SessionError;
use crate::exercise::{Exercise, Selection};
use crate::session::{AudioSynthesizer, ContentGenerator};

/// Default location for fixture JSON/WAV assets.
pub const DEFAULT_FIXTURE_ROOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures");

/// Seconds of trailing silence added after the last script segment.
const SCRIPT_TAIL_SECS: f64 = 1.0;

/// Metadata describing an available fixture.
#[derive(Clone, Debug)]
pub struct FixtureMetadata {
    pub name: String,
    pub exercise_path: PathBuf,
    pub audio_path: Option<PathBuf>,
}

/// Catalog responsible for discovering fixtures on disk.
pub struct FixtureCatalog {
    root: PathBuf,
}

impl FixtureCatalog {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List all fixtures by their metadata.
    pub fn discover(&self) -> Result<Vec<FixtureMetadata>> {
        let mut fixtures = Vec::new();
        if !self.root.exists() {
            return Ok(fixtures);
        }

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                    fixtures.push(self.metadata_for_path(&path)?);
                }
            }
        }

        fixtures.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(fixtures)
    }

    /// Resolve a fixture by name or by a path to its JSON file.
    pub fn resolve(&self, fixture: &str) -> Result<FixtureMetadata> {
        let as_path = Path::new(fixture);
        if as_path.is_file() {
            return self.metadata_for_path(as_path);
        }

        let candidate = self.root.join(format!("{fixture}.json"));
        if candidate.is_file() {
            self.metadata_for_path(&candidate)
        } else {
            Err(anyhow!(
                "Fixture '{fixture}' not found in {}",
                self.root.display()
            ))
        }
    }

    fn metadata_for_path(&self, exercise_path: &Path) -> Result<FixtureMetadata> {
        let name = exercise_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("Invalid fixture name for {}", exercise_path.display()))?
            .to_string();
        let audio_path = exercise_path.with_extension("wav");
        Ok(FixtureMetadata {
            name,
            exercise_path: exercise_path.to_path_buf(),
            audio_path: audio_path.exists().then_some(audio_path),
        })
    }
}

impl Default for FixtureCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_FIXTURE_ROOT)
    }
}

/// Read and parse a fixture exercise, stamping the selection's part/level.
pub fn load_exercise<P: AsRef<Path>>(path: P, selection: &Selection) -> Result<Exercise> {
    let path = path.as_ref();
    let payload = fs::read_to_string(path)
        .with_context(|| format!("reading exercise {}", path.display()))?;
    Exercise::from_generated_json(&payload, selection.part, selection.level)
        .with_context(|| format!("parsing {}", path.display()))
}

// ============================================================================
// CONTENT GENERATOR
// ============================================================================

/// Content generator that replays a stored generator payload
///
/// The payload is read once; every request parses it again so the selection's
/// part and level are stamped the same way the remote generator's response is.
#[derive(Debug, Clone)]
pub struct FileContentGenerator {
    payload: String,
}

impl FileContentGenerator {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let payload = fs::read_to_string(path)
            .with_context(|| format!("reading exercise {}", path.display()))?;
        Ok(Self { payload })
    }

    pub fn from_payload(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

impl ContentGenerator for FileContentGenerator {
    fn generate<'a>(
        &'a self,
        selection: &'a Selection,
    ) -> BoxFuture<'a, Result<Exercise, SessionError>> {
        Box::pin(async move {
            log::debug!(
                "[Fixtures] Generating {} / {} exercise from stored payload",
                selection.part.identifier(),
                selection.level.display_name()
            );
            Exercise::from_generated_json(&self.payload, selection.part, selection.level)
        })
    }
}

// ============================================================================
// SYNTHESIZERS
// ============================================================================

/// Synthesizer that returns a recorded WAV track
#[derive(Debug, Clone)]
pub struct WavSynthesizer {
    path: PathBuf,
}

impl WavSynthesizer {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AudioSynthesizer for WavSynthesizer {
    fn synthesize<'a>(
        &'a self,
        _exercise: &'a Exercise,
    ) -> BoxFuture<'a, Result<AudioTrack, SessionError>> {
        Box::pin(async move { AudioTrack::from_wav_file(&self.path) })
    }
}

/// Synthesizer that returns silence
///
/// With no fixed duration the track covers the script segments plus a short
/// tail, so proof intervals line up with the transcript.
#[derive(Debug, Clone, Copy)]
pub struct SilentSynthesizer {
    duration: Option<f64>,
    sample_rate: u32,
}

impl SilentSynthesizer {
    pub fn with_duration(duration_secs: f64) -> Self {
        Self {
            duration: Some(duration_secs),
            sample_rate: SYNTHESIS_SAMPLE_RATE,
        }
    }

    pub fn fit_to_script() -> Self {
        Self {
            duration: None,
            sample_rate: SYNTHESIS_SAMPLE_RATE,
        }
    }

    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Track duration this synthesizer produces for `exercise`
    pub fn duration_for(&self, exercise: &Exercise) -> f64 {
        match self.duration {
            Some(duration) => duration,
            None => {
                let script_end = exercise
                    .script_segments
                    .iter()
                    .map(|segment| segment.end_time)
                    .chain(exercise.questions.iter().map(|question| question.proof_end))
                    .fold(0.0_f64, f64::max);
                script_end + SCRIPT_TAIL_SECS
            }
        }
    }
}

impl AudioSynthesizer for SilentSynthesizer {
    fn synthesize<'a>(
        &'a self,
        exercise: &'a Exercise,
    ) -> BoxFuture<'a, Result<AudioTrack, SessionError>> {
        let duration = self.duration_for(exercise);
        let sample_rate = self.sample_rate;
        Box::pin(async move { AudioTrack::silent(duration, sample_rate) })
    }
}
