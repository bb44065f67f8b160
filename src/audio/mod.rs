// Audio module - decoded tracks handed from the synthesizer to playback

pub mod track;

pub use track::{AudioTrack, SYNTHESIS_CHANNELS, SYNTHESIS_SAMPLE_RATE};
