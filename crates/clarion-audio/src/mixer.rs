//! Mixes every started source through its gain node into output frames.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::clock::Clock;
use crate::node::SourceNode;

/// Mixer shared between the control side and the render side.
pub type SharedMixer = Arc<Mutex<Mixer>>;

/// A scheduled source and its read position.
#[derive(Debug)]
struct Voice {
    source: SourceNode,
    start_time: f64,
    position: usize,
}

/// Sums active voices into interleaved output and advances the clock.
#[derive(Debug)]
pub struct Mixer {
    clock: Clock,
    channels: usize,
    voices: Vec<Voice>,
    gains: Vec<f32>,
}

impl Mixer {
    pub fn new(clock: Clock, channels: u16) -> Self {
        Self {
            clock,
            channels: usize::from(channels.max(1)),
            voices: Vec::new(),
            gains: Vec::new(),
        }
    }

    pub fn shared(clock: Clock, channels: u16) -> SharedMixer {
        Arc::new(Mutex::new(Self::new(clock, channels)))
    }

    pub const fn clock(&self) -> &Clock {
        &self.clock
    }

    pub const fn channels(&self) -> usize {
        self.channels
    }

    /// Number of voices scheduled or playing.
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Schedule `source` to begin at `when` (seconds on the mixer clock).
    pub fn schedule(&mut self, source: SourceNode, when: f64) {
        debug!(
            "Scheduling source {} at {:.3}s ({} frames, loop: {})",
            source.id(),
            when,
            source.buffer().frames(),
            source.looping()
        );
        self.voices.push(Voice {
            source,
            start_time: when,
            position: 0,
        });
    }

    /// Render interleaved frames into `out`, overwriting its contents, then
    /// advance the clock by the number of frames rendered.
    pub fn render(&mut self, out: &mut [f32]) {
        let channels = self.channels;
        let frames = out.len() / channels;
        out.fill(0.0);

        let start = self.clock.now();
        let step = self.clock.frame_duration();
        self.gains.resize(frames, 0.0);

        for voice in &mut self.voices {
            if voice.source.stop_requested() {
                voice.source.mark_ended();
                continue;
            }

            // A disconnected source keeps its position but is silent
            let Some(gain) = voice.source.output() else {
                continue;
            };
            if !gain.is_connected_to_destination() {
                continue;
            }

            gain.gain().sample_block(start, step, &mut self.gains);

            let buffer = voice.source.buffer();
            let total = buffer.frames();
            let looping = voice.source.looping();

            for (frame, gain_value) in self.gains.iter().enumerate() {
                #[allow(clippy::cast_precision_loss)]
                let t = (frame as f64).mul_add(step, start);
                if t < voice.start_time {
                    continue;
                }

                if voice.position >= total {
                    if looping && total > 0 {
                        voice.position = 0;
                    } else {
                        voice.source.mark_ended();
                        break;
                    }
                }

                let base = frame * channels;
                for (ch, sample) in out[base..base + channels].iter_mut().enumerate() {
                    *sample += buffer.sample(voice.position, ch) * gain_value;
                }
                voice.position += 1;
            }
        }

        let before = self.voices.len();
        self.voices.retain(|voice| !voice.source.has_ended());
        if self.voices.len() != before {
            trace!("Retired {} finished voices", before - self.voices.len());
        }

        self.clock.advance(frames as u64);
    }
}
