//! Error types for Clarion.

use thiserror::Error;

use crate::types::SoundId;

/// Result type alias using Clarion's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Clarion.
#[derive(Error, Debug)]
pub enum Error {
    // Fetch errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] HttpError),

    #[error("Failed to fetch {locator}: {reason}")]
    Fetch { locator: String, reason: String },

    // Audio errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    #[error("Audio output error: {0}")]
    AudioOutput(String),

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    // Playback errors
    #[error("Sound not loaded: {0}")]
    NotLoaded(SoundId),

    #[error("Sound not playing: {0}")]
    NotPlaying(SoundId),

    #[error("Unknown sound: {0}")]
    NotFound(SoundId),

    #[error("Sound {0} was re-registered while loading")]
    Superseded(SoundId),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Generic errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// HTTP-specific errors.
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Request failed with status {status}: {url}")]
    StatusError { status: u16, url: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl Error {
    /// Returns true if this error came from fetching or decoding a sound.
    pub const fn is_load_failure(&self) -> bool {
        matches!(
            self,
            Self::Http(_)
                | Self::Fetch { .. }
                | Self::Decode(_)
                | Self::UnsupportedFormat(_)
                | Self::Superseded(_)
        )
    }

    /// Returns true if this error is a user-facing playback precondition
    /// (nothing loaded, nothing playing, unknown id) rather than a fault.
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NotLoaded(_) | Self::NotPlaying(_) | Self::NotFound(_)
        )
    }
}
