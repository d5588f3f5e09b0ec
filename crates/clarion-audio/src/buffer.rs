//! Decoded PCM audio, shared cheaply between sources.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::fmt;
use std::sync::Arc;

use clarion_core::{Error, Result};

/// A fully decoded sound: interleaved f32 samples plus format info.
///
/// Cloning shares the sample data.
#[derive(Clone)]
pub struct AudioBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
}

impl AudioBuffer {
    /// Create a buffer from interleaved samples.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::InvalidArgument("sample rate must be non-zero".into()));
        }
        if channels == 0 {
            return Err(Error::InvalidArgument("channel count must be non-zero".into()));
        }
        if samples.len() % usize::from(channels) != 0 {
            return Err(Error::InvalidArgument(format!(
                "{} samples do not divide into {channels} channels",
                samples.len()
            )));
        }

        Ok(Self {
            samples: samples.into(),
            sample_rate,
            channels,
        })
    }

    /// Create a silent buffer of `frames` frames.
    pub fn silence(frames: usize, sample_rate: u32, channels: u16) -> Result<Self> {
        Self::new(
            vec![0.0; frames * usize::from(channels)],
            sample_rate,
            channels,
        )
    }

    /// Get the sample rate.
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the number of channels.
    pub const fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Interleaved sample data.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample at `frame` for output channel `channel`.
    ///
    /// Output channels beyond the buffer's channel count wrap around, so a
    /// mono buffer feeds every output channel.
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        let channels = usize::from(self.channels);
        self.samples
            .get(frame * channels + channel % channels)
            .copied()
            .unwrap_or(0.0)
    }

    /// Split into one vector per channel.
    pub fn planes(&self) -> Vec<Vec<f32>> {
        let channels = usize::from(self.channels);
        let mut planes = vec![Vec::with_capacity(self.frames()); channels];
        for frame in self.samples.chunks_exact(channels) {
            for (plane, sample) in planes.iter_mut().zip(frame) {
                plane.push(*sample);
            }
        }
        planes
    }
}

impl fmt::Debug for AudioBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioBuffer")
            .field("frames", &self.frames())
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_rejects_ragged_samples() {
        assert!(AudioBuffer::new(vec![0.0; 3], 44100, 2).is_err());
        assert!(AudioBuffer::new(vec![0.0; 4], 0, 2).is_err());
        assert!(AudioBuffer::new(vec![0.0; 4], 44100, 0).is_err());
    }

    #[test]
    fn test_buffer_duration() {
        let buffer = AudioBuffer::silence(22050, 44100, 2).unwrap();
        assert_eq!(buffer.frames(), 22050);
        assert!((buffer.duration_secs() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_mono_buffer_feeds_all_channels() {
        let buffer = AudioBuffer::new(vec![0.25, 0.5], 8000, 1).unwrap();
        assert!((buffer.sample(1, 0) - 0.5).abs() < f32::EPSILON);
        assert!((buffer.sample(1, 1) - 0.5).abs() < f32::EPSILON);
        assert!(buffer.sample(2, 0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_buffer_planes() {
        let buffer = AudioBuffer::new(vec![1.0, -1.0, 2.0, -2.0], 8000, 2).unwrap();
        assert_eq!(buffer.planes(), vec![vec![1.0, 2.0], vec![-1.0, -2.0]]);
    }
}
