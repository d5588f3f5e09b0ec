//! Playback graph nodes: buffer sources and gain stages.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::buffer::AudioBuffer;
use crate::clock::Clock;
use crate::param::AudioParam;

/// Plays one [`AudioBuffer`] once (or looped) into a connected gain node.
///
/// A source can be started only once; playing the same sound again means
/// building a new source.
#[derive(Debug, Clone)]
pub struct SourceNode {
    inner: Arc<SourceInner>,
}

#[derive(Debug)]
struct SourceInner {
    id: Uuid,
    buffer: AudioBuffer,
    looping: AtomicBool,
    output: Mutex<Option<GainNode>>,
    started: AtomicBool,
    stop_requested: AtomicBool,
    ended: AtomicBool,
}

impl SourceNode {
    pub fn new(buffer: AudioBuffer) -> Self {
        Self {
            inner: Arc::new(SourceInner {
                id: Uuid::new_v4(),
                buffer,
                looping: AtomicBool::new(false),
                output: Mutex::new(None),
                started: AtomicBool::new(false),
                stop_requested: AtomicBool::new(false),
                ended: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn buffer(&self) -> &AudioBuffer {
        &self.inner.buffer
    }

    pub fn looping(&self) -> bool {
        self.inner.looping.load(Ordering::Relaxed)
    }

    pub fn set_loop(&self, looping: bool) {
        self.inner.looping.store(looping, Ordering::Relaxed);
    }

    /// Route this source into `gain`, replacing any previous connection.
    pub fn connect(&self, gain: &GainNode) {
        *self.inner.output.lock() = Some(gain.clone());
    }

    pub fn disconnect(&self) {
        *self.inner.output.lock() = None;
    }

    /// The gain node this source feeds, if connected.
    pub fn output(&self) -> Option<GainNode> {
        self.inner.output.lock().clone()
    }

    /// Whether this source reaches the destination through its gain node.
    pub fn is_routed(&self) -> bool {
        self.output()
            .is_some_and(|gain| gain.is_connected_to_destination())
    }

    /// Whether playback finished, either by reaching the end of a
    /// non-looping buffer or by being stopped.
    pub fn has_ended(&self) -> bool {
        self.inner.ended.load(Ordering::Acquire)
    }

    pub fn has_started(&self) -> bool {
        self.inner.started.load(Ordering::Acquire)
    }

    /// Mark the source as started. Returns false if it already was.
    pub(crate) fn mark_started(&self) -> bool {
        !self.inner.started.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn request_stop(&self) {
        self.inner.stop_requested.store(true, Ordering::Release);
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.inner.stop_requested.load(Ordering::Acquire)
    }

    pub(crate) fn mark_ended(&self) {
        self.inner.ended.store(true, Ordering::Release);
    }
}

/// Scales its input by an automatable gain before the destination.
#[derive(Debug, Clone)]
pub struct GainNode {
    inner: Arc<GainInner>,
}

#[derive(Debug)]
struct GainInner {
    id: Uuid,
    gain: AudioParam,
    to_destination: AtomicBool,
}

impl GainNode {
    /// Create a gain node with unity gain on `clock`.
    pub fn new(clock: Clock) -> Self {
        Self {
            inner: Arc::new(GainInner {
                id: Uuid::new_v4(),
                gain: AudioParam::new(1.0, clock),
                to_destination: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// The gain parameter.
    pub fn gain(&self) -> &AudioParam {
        &self.inner.gain
    }

    pub fn connect_to_destination(&self) {
        self.inner.to_destination.store(true, Ordering::Release);
    }

    pub fn disconnect(&self) {
        self.inner.to_destination.store(false, Ordering::Release);
    }

    pub fn is_connected_to_destination(&self) -> bool {
        self.inner.to_destination.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer() -> AudioBuffer {
        AudioBuffer::silence(8, 8000, 1).unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn test_source_routing() {
        let clock = Clock::new(8000);
        let source = SourceNode::new(buffer());
        let gain = GainNode::new(clock);

        assert!(!source.is_routed());
        source.connect(&gain);
        assert!(!source.is_routed());
        gain.connect_to_destination();
        assert!(source.is_routed());

        gain.disconnect();
        assert!(!source.is_routed());
    }

    #[test]
    fn test_source_starts_once() {
        let source = SourceNode::new(buffer());
        assert!(source.mark_started());
        assert!(!source.mark_started());
        assert!(source.has_started());
    }

    #[test]
    fn test_gain_defaults_to_unity() {
        let gain = GainNode::new(Clock::new(8000));
        assert!((gain.gain().value() - 1.0).abs() < f32::EPSILON);
    }
}
