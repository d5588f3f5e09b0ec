//! # clarion-audio
//!
//! Sound playback for Clarion.
//!
//! Features:
//! - Named sound registry with per-sound volume, loop, and group settings
//! - Two-stage asynchronous loading (fetch, then decode on the blocking pool)
//! - Source → gain → output playback graphs with mute, stop, and live volume
//! - Crossfades scheduled as linear gain ramps on the output clock
//! - Real-time cpal output, or an offline backend rendered on demand

pub mod backend;
pub mod buffer;
pub mod clock;
pub mod context;
pub mod crossfade;
pub mod decode;
pub mod events;
pub mod fetch;
pub mod graph;
pub mod loader;
pub mod mixer;
pub mod node;
pub mod output;
pub mod param;
pub mod probe;
pub mod registry;
pub mod resample;

pub use backend::{AudioBackend, CpalBackend, OfflineBackend};
pub use buffer::AudioBuffer;
pub use clock::Clock;
pub use context::SoundContext;
pub use crossfade::{CrossfadeAction, CrossfadeSchedule, Crossfader};
pub use events::SoundEvent;
pub use fetch::Fetcher;
pub use graph::{PlaybackGraph, PlaybackHandle};
pub use loader::{LoadBatch, LoadReport, Loader};
pub use node::{GainNode, SourceNode};
pub use param::AudioParam;
pub use registry::{Sound, SoundRegistry};
