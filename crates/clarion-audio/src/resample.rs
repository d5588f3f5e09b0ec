//! Audio resampling using rubato.
//!
//! Decoded buffers are converted once to the output rate so the mixer can
//! read them frame by frame.

use clarion_core::{Error, Result};
use rubato::{FftFixedIn, Resampler as RubatoResampler};
use tracing::debug;

use crate::buffer::AudioBuffer;

/// Input frames per resampler call.
const CHUNK_SIZE: usize = 1024;

/// Whole-buffer sample-rate converter.
pub struct Resampler {
    #[allow(clippy::struct_field_names)]
    resampler: FftFixedIn<f32>,
    input_rate: u32,
    output_rate: u32,
    channels: usize,
}

impl Resampler {
    /// Create a new resampler.
    pub fn new(input_rate: u32, output_rate: u32, channels: usize) -> Result<Self> {
        let resampler = FftFixedIn::new(
            input_rate as usize,
            output_rate as usize,
            CHUNK_SIZE,
            2,
            channels,
        )
        .map_err(|e| Error::AudioOutput(format!("Failed to create resampler: {e}")))?;

        debug!(
            "Resampler created: {}Hz -> {}Hz, {} channels",
            input_rate, output_rate, channels
        );

        Ok(Self {
            resampler,
            input_rate,
            output_rate,
            channels,
        })
    }

    /// Get the input sample rate.
    pub const fn input_rate(&self) -> u32 {
        self.input_rate
    }

    /// Get the output sample rate.
    pub const fn output_rate(&self) -> u32 {
        self.output_rate
    }

    /// Resample a complete buffer.
    ///
    /// The resampler's startup delay is trimmed and the result is sized to
    /// exactly `frames * output_rate / input_rate` frames.
    pub fn process_buffer(&mut self, buffer: &AudioBuffer) -> Result<AudioBuffer> {
        if usize::from(buffer.channels()) != self.channels {
            return Err(Error::InvalidArgument(format!(
                "Resampler expects {} channels, buffer has {}",
                self.channels,
                buffer.channels()
            )));
        }

        let planes = buffer.planes();
        let frames = buffer.frames();
        let delay = self.resampler.output_delay();

        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let expected = (frames as f64 * f64::from(self.output_rate) / f64::from(self.input_rate))
            .round() as usize;

        let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected + delay); self.channels];

        let mut pos = 0;
        while pos + CHUNK_SIZE <= frames {
            let chunk: Vec<&[f32]> = planes.iter().map(|p| &p[pos..pos + CHUNK_SIZE]).collect();
            let resampled = self
                .resampler
                .process(&chunk, None)
                .map_err(|e| Error::AudioOutput(format!("Resample failed: {e}")))?;
            append(&mut output, resampled);
            pos += CHUNK_SIZE;
        }

        if pos < frames {
            let rest: Vec<&[f32]> = planes.iter().map(|p| &p[pos..]).collect();
            let resampled = self
                .resampler
                .process_partial(Some(rest.as_slice()), None)
                .map_err(|e| Error::AudioOutput(format!("Resample failed: {e}")))?;
            append(&mut output, resampled);
        }

        // Drain the delay line until the tail is out
        while output[0].len() < expected + delay {
            let resampled = self
                .resampler
                .process_partial::<&[f32]>(None, None)
                .map_err(|e| Error::AudioOutput(format!("Resample failed: {e}")))?;
            if resampled.first().map_or(true, Vec::is_empty) {
                break;
            }
            append(&mut output, resampled);
        }

        let mut interleaved = Vec::with_capacity(expected * self.channels);
        for frame in delay..delay + expected {
            for plane in &output {
                interleaved.push(plane.get(frame).copied().unwrap_or(0.0));
            }
        }

        self.resampler.reset();

        #[allow(clippy::cast_possible_truncation)]
        AudioBuffer::new(interleaved, self.output_rate, self.channels as u16)
    }
}

fn append(output: &mut [Vec<f32>], resampled: Vec<Vec<f32>>) {
    for (plane, chunk) in output.iter_mut().zip(resampled) {
        plane.extend(chunk);
    }
}

/// Convert `buffer` to `output_rate`, or share it unchanged if the rates
/// already match.
pub fn resample_to(buffer: &AudioBuffer, output_rate: u32) -> Result<AudioBuffer> {
    if buffer.sample_rate() == output_rate {
        return Ok(buffer.clone());
    }

    Resampler::new(
        buffer.sample_rate(),
        output_rate,
        usize::from(buffer.channels()),
    )?
    .process_buffer(buffer)
}
