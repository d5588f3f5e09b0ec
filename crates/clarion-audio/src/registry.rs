//! Registry of named sounds and their runtime state.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::collections::HashMap;

use clarion_core::{Error, PlaybackPhase, Result, SoundDescriptor, SoundId};
use tracing::debug;

use crate::buffer::AudioBuffer;
use crate::graph::PlaybackHandle;

/// A registered sound: its descriptor plus the decoded buffer and the
/// playback graph currently in flight, if any.
#[derive(Debug)]
pub struct Sound {
    descriptor: SoundDescriptor,
    buffer: Option<AudioBuffer>,
    active: Option<PlaybackHandle>,
    phase: PlaybackPhase,
    generation: u64,
}

impl Sound {
    pub const fn new(descriptor: SoundDescriptor) -> Self {
        Self {
            descriptor,
            buffer: None,
            active: None,
            phase: PlaybackPhase::Idle,
            generation: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    /// Registration stamp. Changes every time the id is re-registered.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub const fn descriptor(&self) -> &SoundDescriptor {
        &self.descriptor
    }

    pub const fn volume(&self) -> f32 {
        self.descriptor.volume
    }

    pub(crate) fn set_volume(&mut self, volume: f32) {
        self.descriptor.volume = volume;
    }

    /// Decoded audio, present once a load has succeeded.
    pub const fn buffer(&self) -> Option<&AudioBuffer> {
        self.buffer.as_ref()
    }

    pub const fn is_loaded(&self) -> bool {
        self.buffer.is_some()
    }

    /// Store a freshly decoded buffer, replacing any earlier one.
    pub(crate) fn set_buffer(&mut self, buffer: AudioBuffer) {
        self.buffer = Some(buffer);
    }

    /// The playback graph in flight, if any.
    pub const fn active(&self) -> Option<&PlaybackHandle> {
        self.active.as_ref()
    }

    pub const fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: PlaybackPhase) {
        self.phase = phase;
    }

    /// Record a new playback graph. Returns the one it replaces.
    pub(crate) fn replace_active(&mut self, handle: PlaybackHandle) -> Option<PlaybackHandle> {
        self.active.replace(handle)
    }

    pub(crate) fn take_active(&mut self) -> Option<PlaybackHandle> {
        self.phase = PlaybackPhase::Idle;
        self.active.take()
    }

    /// Drop the active handle if its source has finished playing.
    ///
    /// Returns true if a finished handle was cleared.
    pub(crate) fn reap_ended(&mut self) -> bool {
        if self.active.as_ref().is_some_and(PlaybackHandle::is_finished) {
            debug!("Sound {} finished playing", self.descriptor.id);
            self.take_active();
            true
        } else {
            false
        }
    }
}

/// Named sounds, keyed by id.
#[derive(Debug, Default)]
pub struct SoundRegistry {
    sounds: HashMap<SoundId, Sound>,
    next_generation: u64,
}

impl SoundRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of descriptors. Later duplicates win.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = SoundDescriptor>,
    ) -> Result<Self> {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    /// Insert or replace a sound. Replacing discards the old buffer and
    /// handle; the replaced sound is returned.
    ///
    /// Fails with [`Error::InvalidArgument`] for an empty id or a negative
    /// or non-finite volume, leaving the registry unchanged.
    pub fn register(&mut self, descriptor: SoundDescriptor) -> Result<Option<Sound>> {
        descriptor.validate()?;
        debug!(
            "Registering sound {} ({}, volume {}, loop {})",
            descriptor.id, descriptor.locator, descriptor.volume, descriptor.looping
        );

        self.next_generation += 1;
        let mut sound = Sound::new(descriptor);
        sound.generation = self.next_generation;
        Ok(self.sounds.insert(sound.descriptor.id.clone(), sound))
    }

    pub fn get(&self, id: &str) -> Result<&Sound> {
        self.sounds
            .get(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn get_mut(&mut self, id: &str) -> Result<&mut Sound> {
        self.sounds
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sounds.contains_key(id)
    }

    /// All ids, sorted.
    pub fn ids(&self) -> Vec<SoundId> {
        let mut ids: Vec<SoundId> = self.sounds.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Ids of the sounds in `group`, sorted.
    pub fn group(&self, group: &str) -> Vec<SoundId> {
        let mut ids: Vec<SoundId> = self
            .sounds
            .values()
            .filter(|s| s.descriptor.in_group(group))
            .map(|s| s.descriptor.id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let mut registry = SoundRegistry::new();
        assert!(registry.is_empty());

        registry
            .register(SoundDescriptor::new("coin", "audio/coin").with_volume(1.5))
            .unwrap();
        let sound = registry.get("coin").unwrap();
        assert_eq!(sound.descriptor().locator, "audio/coin");
        assert!((sound.volume() - 1.5).abs() < f32::EPSILON);
        assert!(!sound.is_loaded());
        assert!(sound.active().is_none());
        assert_eq!(sound.phase(), PlaybackPhase::Idle);
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let registry = SoundRegistry::new();
        assert!(matches!(registry.get("laser"), Err(Error::NotFound(id)) if id == "laser"));
    }

    #[test]
    fn test_register_replaces_and_drops_buffer() {
        let mut registry = SoundRegistry::new();
        registry
            .register(SoundDescriptor::new("coin", "audio/coin"))
            .unwrap();
        let first = registry.get("coin").unwrap().generation();
        registry
            .get_mut("coin")
            .unwrap()
            .set_buffer(AudioBuffer::silence(4, 8000, 1).unwrap());
        assert!(registry.get("coin").unwrap().is_loaded());

        let old = registry
            .register(SoundDescriptor::new("coin", "audio/coin-v2"))
            .unwrap();
        assert!(old.unwrap().is_loaded());
        let sound = registry.get("coin").unwrap();
        assert!(!sound.is_loaded());
        assert_ne!(sound.generation(), first);
        assert_eq!(sound.descriptor().locator, "audio/coin-v2");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_groups() {
        let registry = SoundRegistry::from_descriptors([
            SoundDescriptor::new("laser", "audio/laser").with_group("sfx"),
            SoundDescriptor::new("coin", "audio/coin").with_group("sfx"),
            SoundDescriptor::new("battle", "audio/the-last-encounter").with_group("music"),
            SoundDescriptor::new("nyan", "audio/nyan"),
        ])
        .unwrap();

        assert_eq!(registry.group("sfx"), vec!["coin", "laser"]);
        assert_eq!(registry.group("music"), vec!["battle"]);
        assert!(registry.group("loops").is_empty());
        assert_eq!(registry.ids(), vec!["battle", "coin", "laser", "nyan"]);
    }

    #[test]
    fn test_register_rejects_negative_volume() {
        let mut registry = SoundRegistry::new();
        registry
            .register(SoundDescriptor::new("coin", "audio/coin"))
            .unwrap();

        let err = registry
            .register(SoundDescriptor::new("coin", "audio/coin-v2").with_volume(-1.0))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(registry.get("coin").unwrap().descriptor().locator, "audio/coin");

        assert!(registry
            .register(SoundDescriptor::new("laser", "audio/laser").with_volume(f32::NAN))
            .is_err());
        assert!(!registry.contains("laser"));
    }
}
