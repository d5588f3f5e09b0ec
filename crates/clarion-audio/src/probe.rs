//! Container support probe, run once at startup to pick the file extension
//! appended to every sound locator.

use clarion_core::{AudioFormat, Error, Result};
use symphonia::core::codecs::{
    CodecType, CODEC_TYPE_FLAC, CODEC_TYPE_MP3, CODEC_TYPE_PCM_S16LE, CODEC_TYPE_VORBIS,
};
use tracing::{debug, info};

const fn codec_for(format: AudioFormat) -> CodecType {
    match format {
        AudioFormat::Ogg => CODEC_TYPE_VORBIS,
        AudioFormat::Mp3 => CODEC_TYPE_MP3,
        AudioFormat::Wav => CODEC_TYPE_PCM_S16LE,
        AudioFormat::Flac => CODEC_TYPE_FLAC,
    }
}

/// Whether the decoder registry can play `format`.
pub fn supports(format: AudioFormat) -> bool {
    symphonia::default::get_codecs()
        .get_codec(codec_for(format))
        .is_some()
}

/// Ogg when Vorbis is available, MP3 otherwise.
pub fn preferred_format() -> AudioFormat {
    let format = if supports(AudioFormat::Ogg) {
        AudioFormat::Ogg
    } else {
        AudioFormat::Mp3
    };
    debug!("Preferred sound format: {format}");
    format
}

/// Use the configured format if one is set and supported, otherwise probe.
pub fn resolve_format(configured: Option<AudioFormat>) -> Result<AudioFormat> {
    match configured {
        Some(format) if supports(format) => {
            info!("Using configured sound format: {format}");
            Ok(format)
        }
        Some(format) => Err(Error::UnsupportedFormat(format!(
            "{format} is not supported by this build"
        ))),
        None => Ok(preferred_format()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_formats_supported() {
        for format in AudioFormat::ALL {
            assert!(supports(format), "{format} should be decodable");
        }
    }

    #[test]
    fn test_prefers_ogg() {
        assert_eq!(preferred_format(), AudioFormat::Ogg);
    }

    #[test]
    fn test_resolve_configured_format() {
        assert_eq!(resolve_format(Some(AudioFormat::Mp3)).ok(), Some(AudioFormat::Mp3));
        assert_eq!(resolve_format(None).ok(), Some(AudioFormat::Ogg));
    }
}
