//! Playback graphs: source → gain → output, one per `play` call.

use clarion_core::{Error, PlaybackPhase, Result};
use tracing::{debug, info};
use uuid::Uuid;

use crate::context::SoundContext;
use crate::events::SoundEvent;
use crate::node::{GainNode, SourceNode};
use crate::registry::Sound;

/// A started playback graph.
///
/// Cloning shares the underlying nodes, so a clone handed to the crossfader
/// controls the same gain the registry holds.
#[derive(Debug, Clone)]
pub struct PlaybackHandle {
    id: Uuid,
    sound: String,
    source: SourceNode,
    gain: GainNode,
    started_at: f64,
}

impl PlaybackHandle {
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Id of the sound this graph plays.
    pub fn sound(&self) -> &str {
        &self.sound
    }

    pub const fn source(&self) -> &SourceNode {
        &self.source
    }

    pub const fn gain(&self) -> &GainNode {
        &self.gain
    }

    /// Output clock time the source was started at.
    pub const fn started_at(&self) -> f64 {
        self.started_at
    }

    /// Gain value at the output clock's current time.
    pub fn gain_value(&self) -> f32 {
        self.gain.gain().value()
    }

    /// Whether the source has stopped producing sound.
    pub fn is_finished(&self) -> bool {
        self.source.has_ended()
    }
}

/// Builds and controls playback graphs for registered sounds.
#[derive(Debug, Clone)]
pub struct PlaybackGraph {
    ctx: SoundContext,
}

impl PlaybackGraph {
    pub const fn new(ctx: SoundContext) -> Self {
        Self { ctx }
    }

    /// Start playing a loaded sound now.
    ///
    /// Fails with [`Error::NotLoaded`] when the id is unknown or has no
    /// buffer yet; nothing is changed in that case. An earlier handle for
    /// the same sound is replaced but keeps playing.
    pub fn play(&self, id: &str) -> Result<PlaybackHandle> {
        let mut registry = self.ctx.registry();
        let sound = registry
            .get_mut(id)
            .map_err(|_| Error::NotLoaded(id.to_string()))?;
        let buffer = sound
            .buffer()
            .ok_or_else(|| Error::NotLoaded(id.to_string()))?;

        let backend = self.ctx.backend();
        let source = backend.create_source(buffer);
        let gain = backend.create_gain();
        gain.gain().set_value(sound.volume());
        source.connect(&gain);
        gain.connect_to_destination();
        source.set_loop(sound.descriptor().looping);

        let started_at = backend.current_time();
        backend.start(&source, started_at)?;

        let handle = PlaybackHandle {
            id: Uuid::new_v4(),
            sound: id.to_string(),
            source,
            gain,
            started_at,
        };

        if let Some(previous) = sound.replace_active(handle.clone()) {
            debug!(
                "Sound {id} replaced handle {} (still playing)",
                previous.id()
            );
        }
        sound.set_phase(PlaybackPhase::Playing);

        info!(
            "Playing {id} at {started_at:.3}s (volume {}, loop {})",
            sound.volume(),
            sound.descriptor().looping
        );
        self.ctx.emit(SoundEvent::Started {
            id: id.to_string(),
            handle: handle.id(),
        });

        Ok(handle)
    }

    /// Set the active graph's gain to 0 immediately, cancelling any ramps.
    /// Repeating it is harmless.
    pub fn mute(&self, id: &str) -> Result<()> {
        let mut registry = self.ctx.registry();
        let sound = registry.get_mut(id)?;
        let handle = Self::active(sound)?;

        handle.gain().gain().set_value(0.0);
        sound.set_phase(PlaybackPhase::Muted);

        debug!("Muted {id}");
        self.ctx.emit(SoundEvent::Muted { id: id.to_string() });
        Ok(())
    }

    /// Update the sound's volume and apply it to the active graph, if any.
    ///
    /// The value is not clamped. A muted sound becomes audible again.
    pub fn set_volume(&self, id: &str, volume: f32) -> Result<()> {
        let mut registry = self.ctx.registry();
        let sound = registry.get_mut(id)?;
        sound.set_volume(volume);
        sound.reap_ended();

        if let Some(handle) = sound.active() {
            handle.gain().gain().set_value(volume);
            sound.set_phase(PlaybackPhase::Playing);
        }

        debug!("Volume of {id} set to {volume}");
        Ok(())
    }

    /// Stop the active graph and release its handle.
    pub fn stop(&self, id: &str) -> Result<()> {
        let mut registry = self.ctx.registry();
        let sound = registry.get_mut(id)?;
        Self::active(sound)?;

        if let Some(handle) = sound.take_active() {
            self.ctx.backend().stop(handle.source());
            handle.gain().disconnect();
        }

        debug!("Stopped {id}");
        self.ctx.emit(SoundEvent::Stopped { id: id.to_string() });
        Ok(())
    }

    /// Play an idle sound, or restore a playing or muted one to its volume.
    pub fn play_or_unmute(&self, id: &str) -> Result<PlaybackHandle> {
        {
            let mut registry = self.ctx.registry();
            let sound = registry
                .get_mut(id)
                .map_err(|_| Error::NotLoaded(id.to_string()))?;
            sound.reap_ended();

            if let Some(handle) = sound.active() {
                let handle = handle.clone();
                handle.gain().gain().set_value(sound.volume());
                sound.set_phase(PlaybackPhase::Playing);
                debug!("Unmuted {id}");
                return Ok(handle);
            }
        }

        self.play(id)
    }

    /// Mute every playing sound in `group`. Returns how many were muted.
    pub fn mute_group(&self, group: &str) -> usize {
        let ids = self.ctx.registry().group(group);
        let muted = ids.iter().filter(|id| self.mute(id).is_ok()).count();
        debug!("Muted {muted} of {} sounds in group {group}", ids.len());
        muted
    }

    /// The active handle for `id`, if a graph is in flight.
    pub fn handle(&self, id: &str) -> Option<PlaybackHandle> {
        let mut registry = self.ctx.registry();
        let sound = registry.get_mut(id).ok()?;
        sound.reap_ended();
        sound.active().cloned()
    }

    /// Current gain of the active graph for `id`.
    pub fn gain(&self, id: &str) -> Option<f32> {
        self.handle(id).map(|h| h.gain_value())
    }

    pub fn phase(&self, id: &str) -> Result<PlaybackPhase> {
        let mut registry = self.ctx.registry();
        let sound = registry.get_mut(id)?;
        sound.reap_ended();
        Ok(sound.phase())
    }

    pub const fn context(&self) -> &SoundContext {
        &self.ctx
    }

    /// The in-flight handle, after clearing one that already finished.
    fn active(sound: &mut Sound) -> Result<PlaybackHandle> {
        sound.reap_ended();
        sound
            .active()
            .cloned()
            .ok_or_else(|| Error::NotPlaying(sound.id().to_string()))
    }
}
