//! Audio container formats.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use serde::{Deserialize, Serialize};

/// Audio container format a sound file is stored in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// Ogg container (Vorbis).
    #[default]
    Ogg,
    /// MPEG layer 3.
    Mp3,
    /// RIFF WAVE.
    Wav,
    /// FLAC (lossless).
    Flac,
}

impl AudioFormat {
    /// All formats, in order of preference.
    pub const ALL: [Self; 4] = [Self::Ogg, Self::Mp3, Self::Wav, Self::Flac];

    /// Parse from a file extension (with or without the leading dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "ogg" | "oga" => Some(Self::Ogg),
            "mp3" => Some(Self::Mp3),
            "wav" | "wave" => Some(Self::Wav),
            "flac" => Some(Self::Flac),
            _ => None,
        }
    }

    /// Get the file extension for this format.
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Ogg => "ogg",
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Flac => "flac",
        }
    }

    /// Get the MIME type for this format.
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Ogg => "audio/ogg",
            Self::Mp3 => "audio/mpeg",
            Self::Wav => "audio/wav",
            Self::Flac => "audio/flac",
        }
    }

    /// Append this format's extension to an extension-less locator.
    pub fn apply_to(&self, locator: &str) -> String {
        format!("{locator}.{}", self.extension())
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(AudioFormat::from_extension(".ogg"), Some(AudioFormat::Ogg));
        assert_eq!(AudioFormat::from_extension("MP3"), Some(AudioFormat::Mp3));
        assert_eq!(AudioFormat::from_extension("wave"), Some(AudioFormat::Wav));
        assert_eq!(AudioFormat::from_extension("webm"), None);
    }

    #[test]
    fn test_format_apply_to_locator() {
        assert_eq!(AudioFormat::Ogg.apply_to("audio/coin"), "audio/coin.ogg");
        assert_eq!(AudioFormat::Mp3.apply_to("audio/coin"), "audio/coin.mp3");
    }

    #[test]
    fn test_format_serde_lowercase() {
        let json = serde_json::to_string(&AudioFormat::Flac).unwrap();
        assert_eq!(json, "\"flac\"");
        let parsed: AudioFormat = serde_json::from_str("\"mp3\"").unwrap();
        assert_eq!(parsed, AudioFormat::Mp3);
    }
}
