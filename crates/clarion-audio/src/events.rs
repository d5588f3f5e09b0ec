//! Notifications emitted by the loader, playback graph, and crossfader.

use clarion_core::SoundId;
use crossbeam_channel::{unbounded, Receiver, Sender};
use uuid::Uuid;

/// Something that happened to a sound.
#[derive(Debug, Clone, PartialEq)]
pub enum SoundEvent {
    /// Fetch and decode finished; the buffer is stored.
    Loaded { id: SoundId, duration_secs: f64 },
    /// Fetch or decode failed; the sound is unchanged.
    LoadFailed { id: SoundId, reason: String },
    /// A playback graph started.
    Started { id: SoundId, handle: Uuid },
    /// Gain forced to zero.
    Muted { id: SoundId },
    /// Playback stopped and the handle released.
    Stopped { id: SoundId },
    /// Opposite ramps scheduled between two sounds.
    CrossfadeScheduled {
        from: SoundId,
        to: SoundId,
        start: f64,
        end: f64,
    },
}

/// Sending half of the event channel.
#[derive(Debug, Clone)]
pub struct EventSender(Sender<SoundEvent>);

impl EventSender {
    /// Publish an event. Dropped silently if every receiver is gone.
    pub fn emit(&self, event: SoundEvent) {
        let _ = self.0.send(event);
    }
}

/// Create an unbounded event channel.
pub fn channel() -> (EventSender, Receiver<SoundEvent>) {
    let (tx, rx) = unbounded();
    (EventSender(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_and_receive() {
        let (tx, rx) = channel();
        tx.emit(SoundEvent::Muted { id: "coin".into() });
        assert_eq!(rx.try_recv().ok(), Some(SoundEvent::Muted { id: "coin".into() }));
    }

    #[test]
    fn test_emit_without_receiver() {
        let (tx, rx) = channel();
        drop(rx);
        tx.emit(SoundEvent::Stopped { id: "coin".into() });
    }
}
