//! Audio decoding using symphonia.

use std::io::Cursor;

use bytes::Bytes;
use clarion_core::{AudioFormat, Error, Result};
use symphonia::core::{
    audio::SampleBuffer,
    codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL},
    errors::Error as SymphoniaError,
    formats::{FormatOptions, FormatReader},
    io::{MediaSourceStream, MediaSourceStreamOptions},
    meta::MetadataOptions,
    probe::Hint,
};
use tracing::{debug, warn};

use crate::buffer::AudioBuffer;

/// Packet-by-packet decoder for one in-memory audio file.
pub struct AudioDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: u16,
}

impl AudioDecoder {
    /// Probe `data` and prepare a decoder for its first audio track.
    pub fn from_bytes(data: Bytes, hint_format: Option<AudioFormat>) -> Result<Self> {
        let mss = MediaSourceStream::new(
            Box::new(Cursor::new(data)),
            MediaSourceStreamOptions::default(),
        );

        let mut hint = Hint::new();
        if let Some(format) = hint_format {
            hint.with_extension(format.extension());
            hint.mime_type(format.mime_type());
        }

        let format_opts = FormatOptions {
            enable_gapless: true,
            ..Default::default()
        };

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &format_opts, &MetadataOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to probe format: {e}")))?;

        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::Decode("No audio tracks found".to_string()))?;

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| Error::Decode("Unknown sample rate".to_string()))?;
        #[allow(clippy::cast_possible_truncation)]
        let channels = track.codec_params.channels.map_or(0, |c| c.count() as u16);

        debug!(
            "Audio track: id={}, sample_rate={}, channels={}",
            track_id, sample_rate, channels
        );

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to create decoder: {e}")))?;

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            channels,
        })
    }

    /// Get the sample rate.
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the channel count reported by the container (0 if unknown).
    pub const fn channels(&self) -> u16 {
        self.channels
    }

    /// Decode the next packet into interleaved f32 samples.
    ///
    /// Returns the samples and their channel count, or `None` at end of
    /// stream.
    pub fn decode_next(&mut self) -> Result<Option<(Vec<f32>, u16)>> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => return Ok(None),
                Err(e) => {
                    return Err(Error::Decode(format!("Failed to read packet: {e}")));
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    #[allow(clippy::cast_possible_truncation)]
                    let channels = spec.channels.count() as u16;
                    let mut samples = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    samples.copy_interleaved_ref(decoded);
                    return Ok(Some((samples.samples().to_vec(), channels)));
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Decode error (skipping packet): {e}");
                }
                Err(e) => {
                    return Err(Error::Decode(format!("Decode failed: {e}")));
                }
            }
        }
    }

    /// Decode every remaining packet into a single buffer.
    pub fn decode_to_end(mut self) -> Result<AudioBuffer> {
        let mut samples = Vec::new();
        let mut channels = self.channels;

        while let Some((chunk, chunk_channels)) = self.decode_next()? {
            if channels == 0 {
                channels = chunk_channels;
            } else if chunk_channels != channels {
                return Err(Error::Decode(format!(
                    "Channel count changed mid-stream: {channels} -> {chunk_channels}"
                )));
            }
            samples.extend_from_slice(&chunk);
        }

        if samples.is_empty() || channels == 0 {
            return Err(Error::Decode("No audio frames decoded".to_string()));
        }

        AudioBuffer::new(samples, self.sample_rate, channels)
    }
}

/// Decode a whole file held in memory.
pub fn decode_bytes(data: Bytes, hint_format: Option<AudioFormat>) -> Result<AudioBuffer> {
    let size = data.len();
    let buffer = AudioDecoder::from_bytes(data, hint_format)?.decode_to_end()?;
    debug!(
        "Decoded {} bytes into {} frames ({:.2}s)",
        size,
        buffer.frames(),
        buffer.duration_secs()
    );
    Ok(buffer)
}
