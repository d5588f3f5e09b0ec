//! # clarion-core
//!
//! Core types, configuration, and error handling for the Clarion sound
//! playback library.

pub mod config;
pub mod error;
pub mod types;

pub use config::{AssetRoot, ClarionConfig, OutputSettings, DEFAULT_CROSSFADE_SECS};
pub use error::{Error, HttpError, Result};
pub use types::*;
