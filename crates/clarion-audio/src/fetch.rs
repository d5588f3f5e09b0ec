//! Byte fetching for sound files: HTTP, a local directory, or memory.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use clarion_core::{AssetRoot, Error, HttpError, Result};
use parking_lot::RwLock;
use tracing::debug;
use url::Url;

/// Source of raw sound bytes, addressed by relative path
/// (locator plus extension).
#[derive(Debug, Clone)]
pub enum Fetcher {
    /// GET relative to a base URL.
    Http { client: reqwest::Client, base: Url },
    /// Read relative to a directory.
    Directory(PathBuf),
    /// In-memory files keyed by path.
    Memory(Arc<RwLock<HashMap<String, Bytes>>>),
}

impl Fetcher {
    /// Build a fetcher for a configured asset root.
    pub fn for_root(root: &AssetRoot) -> Self {
        match root {
            AssetRoot::Directory(dir) => Self::Directory(dir.clone()),
            AssetRoot::Url(base) => Self::Http {
                client: reqwest::Client::new(),
                base: base.clone(),
            },
        }
    }

    /// Empty in-memory fetcher.
    pub fn memory() -> Self {
        Self::Memory(Arc::new(RwLock::new(HashMap::new())))
    }

    /// Add a file to an in-memory fetcher. Other variants are read-only.
    pub fn insert(&self, path: impl Into<String>, data: impl Into<Bytes>) -> Result<()> {
        match self {
            Self::Memory(files) => {
                files.write().insert(path.into(), data.into());
                Ok(())
            }
            _ => Err(Error::InvalidArgument(
                "only in-memory fetchers accept inserted files".to_string(),
            )),
        }
    }

    /// Describe where `path` resolves to, for logs and reports.
    pub fn describe(&self, path: &str) -> String {
        match self {
            Self::Http { base, .. } => base
                .join(path)
                .map_or_else(|_| format!("{base}{path}"), String::from),
            Self::Directory(dir) => dir.join(path).display().to_string(),
            Self::Memory(_) => format!("memory:{path}"),
        }
    }

    /// Fetch the bytes at `path`.
    pub async fn fetch(&self, path: &str) -> Result<Bytes> {
        let data = match self {
            Self::Http { client, base } => Self::fetch_http(client, base, path).await?,
            Self::Directory(dir) => {
                let file = dir.join(path);
                tokio::fs::read(&file)
                    .await
                    .map(Bytes::from)
                    .map_err(|e| Error::Fetch {
                        locator: file.display().to_string(),
                        reason: e.to_string(),
                    })?
            }
            Self::Memory(files) => Self::fetch_memory(files, path)?,
        };

        debug!("Fetched {} bytes from {}", data.len(), self.describe(path));
        Ok(data)
    }

    fn fetch_memory(files: &RwLock<HashMap<String, Bytes>>, path: &str) -> Result<Bytes> {
        files.read().get(path).cloned().ok_or_else(|| Error::Fetch {
            locator: path.to_string(),
            reason: "not found".to_string(),
        })
    }

    async fn fetch_http(client: &reqwest::Client, base: &Url, path: &str) -> Result<Bytes> {
        let url = base
            .join(path)
            .map_err(|e| HttpError::InvalidUrl(format!("{base} + {path}: {e}")))?;

        let response = client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout
            } else {
                HttpError::ConnectionFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::StatusError {
                status: status.as_u16(),
                url: url.to_string(),
            }
            .into());
        }

        response.bytes().await.map_err(|e| Error::Fetch {
            locator: url.to_string(),
            reason: format!("Failed to read response: {e}"),
        })
    }
}
