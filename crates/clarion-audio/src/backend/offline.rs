//! Backend rendered on demand into memory.

use super::AudioBackend;
use crate::clock::Clock;
use crate::mixer::{Mixer, SharedMixer};

/// Backend whose clock only moves when [`OfflineBackend::render`] or
/// [`OfflineBackend::advance`] is called.
///
/// Useful for headless runs and for inspecting scheduled gain ramps at exact
/// times.
pub struct OfflineBackend {
    clock: Clock,
    mixer: SharedMixer,
    channels: u16,
}

impl OfflineBackend {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        let clock = Clock::new(sample_rate);
        let mixer = Mixer::shared(clock.clone(), channels);
        Self {
            clock,
            mixer,
            channels: channels.max(1),
        }
    }

    pub const fn channels(&self) -> u16 {
        self.channels
    }

    /// Render `frames` frames of interleaved output, advancing the clock.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames * usize::from(self.channels)];
        self.mixer.lock().render(&mut out);
        out
    }

    /// Render enough frames to move the clock forward by `secs` seconds.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn advance(&self, secs: f64) -> Vec<f32> {
        let frames = (secs.max(0.0) * f64::from(self.clock.sample_rate())).round() as usize;
        self.render(frames)
    }

    /// Number of sources scheduled or playing.
    pub fn active_voices(&self) -> usize {
        self.mixer.lock().active_voices()
    }
}

impl AudioBackend for OfflineBackend {
    fn clock(&self) -> &Clock {
        &self.clock
    }

    fn mixer(&self) -> &SharedMixer {
        &self.mixer
    }
}
