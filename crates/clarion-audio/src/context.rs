//! Shared context handed to every component: backend, registry, fetcher and
//! the resolved sound format.

use std::sync::Arc;

use clarion_core::{AudioFormat, ClarionConfig, Result, DEFAULT_CROSSFADE_SECS};
use crossbeam_channel::Receiver;
use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::info;

use crate::backend::AudioBackend;
use crate::events::{self, EventSender, SoundEvent};
use crate::fetch::Fetcher;
use crate::probe;
use crate::registry::SoundRegistry;

/// Explicit shared state for the loader, playback graph and crossfader.
///
/// Created once at startup; cloning shares the same registry and backend.
#[derive(Clone)]
pub struct SoundContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    backend: Arc<dyn AudioBackend>,
    registry: Mutex<SoundRegistry>,
    fetcher: Fetcher,
    format: AudioFormat,
    crossfade_secs: RwLock<f64>,
    events_tx: EventSender,
    // Keeps the unbounded channel open; see `SoundContext::events`.
    events_rx: Receiver<SoundEvent>,
}

impl SoundContext {
    pub fn new(backend: Arc<dyn AudioBackend>, fetcher: Fetcher, format: AudioFormat) -> Self {
        Self::build(backend, fetcher, format, DEFAULT_CROSSFADE_SECS, SoundRegistry::new())
    }

    /// Build a context from configuration: probe or validate the format,
    /// open the asset root and register the manifest's sounds.
    pub fn from_config(config: &ClarionConfig, backend: Arc<dyn AudioBackend>) -> Result<Self> {
        config.validate()?;
        let format = probe::resolve_format(config.format)?;
        let fetcher = Fetcher::for_root(&config.assets);
        let registry = SoundRegistry::from_descriptors(config.sounds.iter().cloned())?;

        info!(
            "Sound context ready: {} sounds from {} as .{}",
            registry.len(),
            config.assets,
            format.extension()
        );

        Ok(Self::build(
            backend,
            fetcher,
            format,
            config.crossfade_secs,
            registry,
        ))
    }

    fn build(
        backend: Arc<dyn AudioBackend>,
        fetcher: Fetcher,
        format: AudioFormat,
        crossfade_secs: f64,
        registry: SoundRegistry,
    ) -> Self {
        let (events_tx, events_rx) = events::channel();
        Self {
            inner: Arc::new(ContextInner {
                backend,
                registry: Mutex::new(registry),
                fetcher,
                format,
                crossfade_secs: RwLock::new(crossfade_secs),
                events_tx,
                events_rx,
            }),
        }
    }

    /// Replace the default crossfade duration for every clone.
    #[must_use]
    pub fn with_crossfade_secs(self, secs: f64) -> Self {
        *self.inner.crossfade_secs.write() = secs;
        self
    }

    pub fn backend(&self) -> &dyn AudioBackend {
        self.inner.backend.as_ref()
    }

    /// Lock the registry. Never hold the guard across an await.
    pub fn registry(&self) -> MutexGuard<'_, SoundRegistry> {
        self.inner.registry.lock()
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.inner.fetcher
    }

    /// Extension appended to every locator.
    pub fn format(&self) -> AudioFormat {
        self.inner.format
    }

    /// Current time on the backend's output clock, in seconds.
    pub fn now(&self) -> f64 {
        self.inner.backend.current_time()
    }

    pub fn crossfade_secs(&self) -> f64 {
        *self.inner.crossfade_secs.read()
    }

    pub(crate) fn emit(&self, event: SoundEvent) {
        self.inner.events_tx.emit(event);
    }

    /// Receiver for [`SoundEvent`]s published by every component sharing
    /// this context.
    ///
    /// The context holds a receiver of its own, so the channel never
    /// disconnects and unread events stay queued for the context's lifetime.
    /// Long-running callers should drain it with [`Self::try_recv_event`] or a
    /// receiver from here.
    pub fn events(&self) -> Receiver<SoundEvent> {
        self.inner.events_rx.clone()
    }

    pub fn try_recv_event(&self) -> Option<SoundEvent> {
        self.inner.events_rx.try_recv().ok()
    }
}

impl std::fmt::Debug for SoundContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundContext")
            .field("format", &self.inner.format)
            .field("crossfade_secs", &self.crossfade_secs())
            .field("sounds", &self.inner.registry.try_lock().map(|r| r.len()))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::backend::OfflineBackend;
    use clarion_core::{AssetRoot, SoundDescriptor};

    #[test]
    fn test_from_config_registers_manifest() {
        let config = ClarionConfig {
            assets: AssetRoot::parse("https://example.com/demo").unwrap(),
            format: Some(AudioFormat::Mp3),
            crossfade_secs: 2.0,
            sounds: vec![
                SoundDescriptor::new("coin", "audio/coin").with_volume(1.5),
                SoundDescriptor::new("laser", "audio/laser").with_volume(2.0),
            ],
            ..ClarionConfig::default()
        };

        let ctx = SoundContext::from_config(&config, Arc::new(OfflineBackend::new(8000, 1)))
            .unwrap();
        assert_eq!(ctx.format(), AudioFormat::Mp3);
        assert!((ctx.crossfade_secs() - 2.0).abs() < f64::EPSILON);
        assert_eq!(ctx.registry().ids(), vec!["coin", "laser"]);
        assert!(matches!(ctx.fetcher(), Fetcher::Http { .. }));
    }

    #[test]
    fn test_with_crossfade_keeps_registry() {
        let ctx = SoundContext::new(
            Arc::new(OfflineBackend::new(8000, 1)),
            Fetcher::memory(),
            AudioFormat::Wav,
        );
        assert!((ctx.crossfade_secs() - DEFAULT_CROSSFADE_SECS).abs() < f64::EPSILON);
        ctx.registry()
            .register(SoundDescriptor::new("coin", "audio/coin"))
            .unwrap();

        let ctx = ctx.with_crossfade_secs(0.5);
        assert!((ctx.crossfade_secs() - 0.5).abs() < f64::EPSILON);
        assert!(ctx.registry().contains("coin"));
    }

    #[test]
    fn test_events_are_shared_between_clones() {
        let ctx = SoundContext::new(
            Arc::new(OfflineBackend::new(8000, 1)),
            Fetcher::memory(),
            AudioFormat::Wav,
        );
        let other = ctx.clone();
        other.emit(SoundEvent::Muted { id: "coin".into() });
        assert_eq!(
            ctx.try_recv_event(),
            Some(SoundEvent::Muted { id: "coin".into() })
        );
        assert!(ctx.now().abs() < f64::EPSILON);
    }

    #[test]
    fn test_events_queue_until_drained() {
        let ctx = SoundContext::new(
            Arc::new(OfflineBackend::new(8000, 1)),
            Fetcher::memory(),
            AudioFormat::Wav,
        );
        let events = ctx.events();
        for _ in 0..3 {
            ctx.emit(SoundEvent::Stopped { id: "coin".into() });
        }
        assert_eq!(events.len(), 3);

        while ctx.try_recv_event().is_some() {}
        assert!(events.is_empty());
        assert!(events.try_recv().is_err());
    }
}
