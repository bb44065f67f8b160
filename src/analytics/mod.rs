//! Interaction and assistance analytics for a session
//!
//! - `events`: append-only interaction log (replays, pauses, seeks)
//! - `assistance`: per-question record of lifeline and script use

pub mod assistance;
pub mod events;

pub use assistance::{
    lifeline_hidden_options, AssistanceLedger, AssistanceMechanism, AssistanceRecord,
};
pub use events::{InteractionEvent, InteractionKind, InteractionLog};
