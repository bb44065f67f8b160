//! Engine module housing the audio clock.
//!
//! This module exposes trait-based output backends (`backend`) and the
//! `ClockSource` (`clock`) that turns an output plus a time source into the
//! single audio timeline the playback controller reads from.

pub mod backend;
pub mod clock;

#[cfg(feature = "device_output")]
pub use backend::CpalOutput;
pub use backend::{
    AudioOutput, EmitterId, EmitterRequest, ManualTimeSource, StubOutput, SystemTimeSource,
    TimeSource,
};
pub use clock::ClockSource;
