//! Audio backends: the host capability the playback graph is built on.
//!
//! A backend owns an output clock and a mixer. Everything else (decoding,
//! node creation, starting and stopping sources) is shared behaviour on top
//! of those two.

mod realtime;
mod offline;

pub use self::realtime::CpalBackend;
pub use self::offline::OfflineBackend;

use bytes::Bytes;
use clarion_core::{AudioFormat, Error, Result};

use crate::buffer::AudioBuffer;
use crate::clock::Clock;
use crate::decode::decode_bytes;
use crate::mixer::SharedMixer;
use crate::node::{GainNode, SourceNode};
use crate::resample::resample_to;

/// Host audio capability.
pub trait AudioBackend: Send + Sync {
    /// Clock advanced by this backend's renderer.
    fn clock(&self) -> &Clock;

    /// Mixer that started sources are scheduled on.
    fn mixer(&self) -> &SharedMixer;

    /// Current output time in seconds.
    fn current_time(&self) -> f64 {
        self.clock().now()
    }

    fn sample_rate(&self) -> u32 {
        self.clock().sample_rate()
    }

    /// Decode a complete file and convert it to the output sample rate.
    ///
    /// Blocking; callers on an async runtime should run it off the reactor.
    fn decode(&self, data: Bytes, hint: Option<AudioFormat>) -> Result<AudioBuffer> {
        let decoded = decode_bytes(data, hint)?;
        resample_to(&decoded, self.sample_rate())
    }

    fn create_source(&self, buffer: &AudioBuffer) -> SourceNode {
        SourceNode::new(buffer.clone())
    }

    /// Create a unity gain node on this backend's clock.
    fn create_gain(&self) -> GainNode {
        GainNode::new(self.clock().clone())
    }

    /// Begin playing `source` at `when` seconds (clamped to now).
    ///
    /// The source must be routed to the destination through a gain node and
    /// must not have been started before.
    fn start(&self, source: &SourceNode, when: f64) -> Result<()> {
        if !source.is_routed() {
            return Err(Error::AudioOutput(
                "Source is not connected to the destination".to_string(),
            ));
        }
        if !source.mark_started() {
            return Err(Error::InvalidArgument(format!(
                "Source {} already started",
                source.id()
            )));
        }

        let when = when.max(self.current_time());
        self.mixer().lock().schedule(source.clone(), when);
        Ok(())
    }

    /// Stop `source`. It falls silent on the next rendered block.
    fn stop(&self, source: &SourceNode) {
        source.request_stop();
    }
}
