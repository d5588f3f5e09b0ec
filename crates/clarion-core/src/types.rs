//! Core domain types for Clarion.

pub mod format;
pub mod sound;

pub use format::AudioFormat;
pub use sound::{PlaybackPhase, SoundDescriptor, SoundId};
