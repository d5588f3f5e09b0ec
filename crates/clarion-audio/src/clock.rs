//! Output clock: frames rendered so far, expressed in seconds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic playback clock shared by a backend, its mixer, and every gain
/// parameter it creates.
///
/// Time only advances when the mixer renders frames, so scheduled ramps run
/// on the output's timeline rather than the caller's.
#[derive(Debug, Clone)]
pub struct Clock {
    frames: Arc<AtomicU64>,
    sample_rate: u32,
}

impl Clock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate: sample_rate.max(1),
        }
    }

    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames rendered since the clock was created.
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    /// Current time in seconds.
    #[allow(clippy::cast_precision_loss)]
    pub fn now(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration(&self) -> f64 {
        1.0 / f64::from(self.sample_rate)
    }

    pub(crate) fn advance(&self, frames: u64) {
        self.frames.fetch_add(frames, Ordering::AcqRel);
    }
}
