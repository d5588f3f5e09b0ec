//! Sound descriptors: the static description of a registered sound.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Unique identifier for a sound.
pub type SoundId = String;

const fn default_volume() -> f32 {
    1.0
}

/// Static description of one sound: where it lives and how it should play.
///
/// Runtime state (the decoded buffer, the active playback graph) is kept
/// alongside the descriptor by the audio crate's registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SoundDescriptor {
    /// Registry key.
    pub id: SoundId,
    /// Source path without a file extension, e.g. `audio/coin`.
    #[serde(alias = "src")]
    pub locator: String,
    /// Gain applied when playback starts. Not clamped.
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Whether playback loops until stopped.
    #[serde(default, rename = "loop")]
    pub looping: bool,
    /// Optional group name, used for batch loading and muting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl SoundDescriptor {
    pub fn new(id: impl Into<SoundId>, locator: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            locator: locator.into(),
            volume: default_volume(),
            looping: false,
            group: None,
        }
    }

    #[must_use]
    pub const fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    #[must_use]
    pub const fn with_loop(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Check whether this sound belongs to `group`.
    pub fn in_group(&self, group: &str) -> bool {
        self.group.as_deref() == Some(group)
    }

    /// Reject an empty id or a volume that is negative or not finite.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::InvalidArgument("Sound with empty id".to_string()));
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "Sound {} has invalid volume {}",
                self.id, self.volume
            )));
        }
        Ok(())
    }
}

/// Where a sound is in its playback lifecycle.
///
/// Replaces handlers that rewrite themselves after their first call: a single
/// entry point inspects the phase instead.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackPhase {
    /// Never started, stopped, or finished playing.
    #[default]
    Idle,
    /// A playback graph is running at the sound's volume.
    Playing,
    /// A playback graph is running with its gain forced to zero.
    Muted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_defaults() {
        let sound = SoundDescriptor::new("coin", "audio/coin");
        assert_eq!(sound.id, "coin");
        assert!((sound.volume - 1.0).abs() < f32::EPSILON);
        assert!(!sound.looping);
        assert!(sound.group.is_none());
    }

    #[test]
    fn test_descriptor_builder() {
        let sound = SoundDescriptor::new("battle", "audio/the-last-encounter")
            .with_volume(0.0)
            .with_loop(true)
            .with_group("music");
        assert!(sound.looping);
        assert!(sound.in_group("music"));
        assert!(!sound.in_group("loops"));
    }

    #[test]
    fn test_descriptor_from_manifest_json() {
        let json = r#"{ "id": "coin", "src": "audio/coin", "volume": 1.5 }"#;
        let sound: SoundDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(sound.locator, "audio/coin");
        assert!((sound.volume - 1.5).abs() < f32::EPSILON);
        assert!(!sound.looping);

        let json = r#"{ "id": "nyan", "locator": "audio/nyan", "loop": true }"#;
        let sound: SoundDescriptor = serde_json::from_str(json).unwrap();
        assert!(sound.looping);
        assert!((sound.volume - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_descriptor_validate() {
        assert!(SoundDescriptor::new("coin", "audio/coin").validate().is_ok());
        assert!(SoundDescriptor::new("eclipse", "audio/red-eclipse")
            .with_volume(0.0)
            .validate()
            .is_ok());
        assert!(SoundDescriptor::new("", "audio/coin").validate().is_err());
        assert!(SoundDescriptor::new("coin", "audio/coin")
            .with_volume(-0.5)
            .validate()
            .is_err());
        assert!(SoundDescriptor::new("coin", "audio/coin")
            .with_volume(f32::NAN)
            .validate()
            .is_err());
    }
}
