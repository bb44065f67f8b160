//! External collaborators a session depends on.
//!
//! Real implementations call remote services; the crate only ships the
//! file-backed ones in `fixtures`.

use futures::future::BoxFuture;

use crate::audio::AudioTrack;
use crate::error::SessionError;
use crate::exercise::{Exercise, Selection};

/// Produces an exercise for a selection
///
/// Implementations stamp the requested part and level onto the exercise
/// (see [`Exercise::from_generated_json`]).
pub trait ContentGenerator: Send + Sync {
    fn generate<'a>(
        &'a self,
        selection: &'a Selection,
    ) -> BoxFuture<'a, Result<Exercise, SessionError>>;
}

/// Produces the audio for an exercise's script
pub trait AudioSynthesizer: Send + Sync {
    fn synthesize<'a>(
        &'a self,
        exercise: &'a Exercise,
    ) -> BoxFuture<'a, Result<AudioTrack, SessionError>>;
}
