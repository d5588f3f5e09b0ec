//! Two-stage sound loading: fetch the bytes, then decode them off the
//! async reactor and store the buffer in the registry.

use bytes::Bytes;
use clarion_core::{Error, Result, SoundId};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::buffer::AudioBuffer;
use crate::context::SoundContext;
use crate::events::SoundEvent;

/// Outcome of a successful load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub id: SoundId,
    /// Where the bytes came from.
    pub url: String,
    /// Size of the fetched file.
    pub bytes: usize,
    pub duration_secs: f64,
}

/// Loads registered sounds into playable buffers.
#[derive(Debug, Clone)]
pub struct Loader {
    ctx: SoundContext,
}

impl Loader {
    pub const fn new(ctx: SoundContext) -> Self {
        Self { ctx }
    }

    /// Fetch and decode one sound, storing its buffer on success.
    ///
    /// On failure the sound is left untouched and the error is both
    /// returned and published as [`SoundEvent::LoadFailed`]. If the id is
    /// re-registered while the load is in flight the decoded buffer is
    /// discarded with [`Error::Superseded`]. Concurrent loads of the same
    /// registration are not coordinated; the last decode to finish wins.
    pub async fn load(&self, id: &str) -> Result<LoadReport> {
        let (locator, generation) = {
            let registry = self.ctx.registry();
            let sound = registry.get(id)?;
            (sound.descriptor().locator.clone(), sound.generation())
        };

        let path = self.ctx.format().apply_to(&locator);
        let url = self.ctx.fetcher().describe(&path);
        debug!("Loading {id} from {url}");

        let result = self
            .fetch_and_decode(&path)
            .await
            .and_then(|(bytes, buffer)| {
                let duration_secs = buffer.duration_secs();
                self.store(id, generation, buffer)?;
                Ok((bytes, duration_secs))
            });

        match result {
            Ok((bytes, duration_secs)) => {
                info!("Loaded {id} ({bytes} bytes, {duration_secs:.2}s)");
                self.ctx.emit(SoundEvent::Loaded {
                    id: id.to_string(),
                    duration_secs,
                });
                Ok(LoadReport {
                    id: id.to_string(),
                    url,
                    bytes,
                    duration_secs,
                })
            }
            Err(e) => {
                warn!("Failed to load {id} from {url}: {e}");
                self.ctx.emit(SoundEvent::LoadFailed {
                    id: id.to_string(),
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Store `buffer` only if `id` is still the registration the load
    /// started from.
    fn store(&self, id: &str, generation: u64, buffer: AudioBuffer) -> Result<()> {
        let mut registry = self.ctx.registry();
        match registry.get_mut(id) {
            Ok(sound) if sound.generation() == generation => {
                sound.set_buffer(buffer);
                Ok(())
            }
            _ => Err(Error::Superseded(id.to_string())),
        }
    }

    async fn fetch_and_decode(&self, path: &str) -> Result<(usize, AudioBuffer)> {
        let data: Bytes = self.ctx.fetcher().fetch(path).await?;
        let size = data.len();

        let ctx = self.ctx.clone();
        let format = self.ctx.format();
        let buffer = tokio::task::spawn_blocking(move || ctx.backend().decode(data, Some(format)))
            .await
            .map_err(|e| Error::Internal(format!("Decode task failed: {e}")))??;

        Ok((size, buffer))
    }

    /// Dispatch a load for every id and return without waiting.
    ///
    /// Must be called inside a tokio runtime.
    pub fn load_all<I, S>(&self, ids: I) -> LoadBatch
    where
        I: IntoIterator<Item = S>,
        S: Into<SoundId>,
    {
        let tasks: Vec<(SoundId, JoinHandle<Result<LoadReport>>)> = ids
            .into_iter()
            .map(|id| {
                let id: SoundId = id.into();
                let loader = self.clone();
                let task_id = id.clone();
                (id, tokio::spawn(async move { loader.load(&task_id).await }))
            })
            .collect();

        info!("Dispatched {} loads", tasks.len());
        LoadBatch { tasks }
    }

    /// Dispatch a load for every sound in `group`.
    pub fn load_group(&self, group: &str) -> LoadBatch {
        let ids = self.ctx.registry().group(group);
        self.load_all(ids)
    }

    pub const fn context(&self) -> &SoundContext {
        &self.ctx
    }
}

/// Loads in flight, dispatched together by [`Loader::load_all`].
#[derive(Debug)]
pub struct LoadBatch {
    tasks: Vec<(SoundId, JoinHandle<Result<LoadReport>>)>,
}

impl LoadBatch {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|(id, _)| id.as_str())
    }

    /// Wait for every load and collect the results in dispatch order.
    pub async fn join(self) -> Vec<(SoundId, Result<LoadReport>)> {
        let mut results = Vec::with_capacity(self.tasks.len());
        for (id, task) in self.tasks {
            let result = task
                .await
                .unwrap_or_else(|e| Err(Error::Internal(format!("Load task for {id} failed: {e}"))));
            results.push((id, result));
        }
        results
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::io::Cursor;
    use std::sync::Arc;

    use super::*;
    use crate::backend::OfflineBackend;
    use crate::fetch::Fetcher;
    use clarion_core::{AudioFormat, SoundDescriptor};

    fn wav_bytes(sample_rate: u32, frames: usize) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..frames {
                writer.write_sample(i16::MAX / 4).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    fn loader() -> Loader {
        let fetcher = Fetcher::memory();
        fetcher.insert("audio/coin.wav", wav_bytes(8000, 800)).unwrap();
        fetcher.insert("audio/broken.wav", b"not a wav".to_vec()).unwrap();

        let ctx = SoundContext::new(
            Arc::new(OfflineBackend::new(8000, 1)),
            fetcher,
            AudioFormat::Wav,
        );
        {
            let mut registry = ctx.registry();
            registry
                .register(SoundDescriptor::new("coin", "audio/coin").with_group("sfx"))
                .unwrap();
            registry
                .register(SoundDescriptor::new("laser", "audio/laser").with_group("sfx"))
                .unwrap();
            registry
                .register(SoundDescriptor::new("broken", "audio/broken"))
                .unwrap();
        }
        Loader::new(ctx)
    }

    #[tokio::test]
    async fn test_load_stores_buffer() {
        let loader = loader();
        let report = loader.load("coin").await.unwrap();

        assert_eq!(report.url, "memory:audio/coin.wav");
        assert!((report.duration_secs - 0.1).abs() < 1e-6);
        assert!(report.bytes > 1600);
        assert!(loader.context().registry().get("coin").unwrap().is_loaded());
        assert!(matches!(
            loader.context().try_recv_event(),
            Some(SoundEvent::Loaded { id, .. }) if id == "coin"
        ));
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_sound_untouched() {
        let loader = loader();
        let err = loader.load("laser").await.unwrap_err();

        assert!(err.is_load_failure());
        assert!(!loader.context().registry().get("laser").unwrap().is_loaded());
        assert!(matches!(
            loader.context().try_recv_event(),
            Some(SoundEvent::LoadFailed { id, .. }) if id == "laser"
        ));
    }

    #[tokio::test]
    async fn test_decode_failure_leaves_sound_untouched() {
        let loader = loader();
        let err = loader.load("broken").await.unwrap_err();
        assert!(err.is_load_failure());
        assert!(!loader.context().registry().get("broken").unwrap().is_loaded());
    }

    #[tokio::test]
    async fn test_load_unknown_id() {
        let loader = loader();
        assert!(matches!(loader.load("nyan").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_load_group_joins_every_result() {
        let loader = loader();
        let batch = loader.load_group("sfx");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.ids().collect::<Vec<_>>(), vec!["coin", "laser"]);

        let results = batch.join().await;
        assert_eq!(results.len(), 2);
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
    }

    #[tokio::test]
    async fn test_reregister_during_load_discards_stale_buffer() {
        let loader = loader();
        let batch = loader.load_all(["coin"]);
        tokio::task::yield_now().await;

        loader
            .context()
            .registry()
            .register(SoundDescriptor::new("coin", "audio/coin-missing"))
            .unwrap();

        let results = batch.join().await;
        assert!(results[0].1.is_err());
        let registry = loader.context().registry();
        let sound = registry.get("coin").unwrap();
        assert!(!sound.is_loaded());
        assert_eq!(sound.descriptor().locator, "audio/coin-missing");
    }
}
