//! HTTP download of reference clips with an on-disk cache.

use parrot_core::{AudioError, ClipFetcher, CoreResult};

use std::{panic::Location, path::PathBuf, time::Duration};

use async_trait::async_trait;
use error_location::ErrorLocation;
use tracing::{debug, info, instrument, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches clips over HTTP(S), keeping a copy of each in `cache_dir`.
pub struct HttpClipFetcher {
    client: reqwest::Client,
    cache_dir: Option<PathBuf>,
}

impl HttpClipFetcher {
    /// Fetcher caching into `cache_dir` (None = no cache).
    #[track_caller]
    pub fn new(cache_dir: Option<PathBuf>) -> CoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AudioError::LoadError {
                reason: format!("Failed to build HTTP client: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        Ok(Self { client, cache_dir })
    }

    /// Cache file for `url`: its last path segment.
    pub fn cache_path(&self, url: &str) -> Option<PathBuf> {
        let dir = self.cache_dir.as_ref()?;
        let name = url.rsplit('/').next().filter(|n| !n.is_empty())?;
        Some(dir.join(name))
    }

    async fn store(&self, url: &str, bytes: &[u8]) {
        let Some(path) = self.cache_path(url) else {
            return;
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!(error = %e, "Failed to create clip cache dir");
                return;
            }
        }
        if let Err(e) = tokio::fs::write(&path, bytes).await {
            warn!(path = ?path, error = %e, "Failed to cache clip");
        }
    }
}

#[async_trait]
impl ClipFetcher for HttpClipFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> CoreResult<Vec<u8>> {
        if let Some(path) = self.cache_path(url) {
            if let Ok(bytes) = tokio::fs::read(&path).await {
                debug!(path = ?path, len = bytes.len(), "Clip served from cache");
                return Ok(bytes);
            }
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AudioError::LoadError {
                reason: format!("Failed to download {}: {}", url, e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let bytes = response.bytes().await.map_err(|e| AudioError::LoadError {
            reason: format!("Failed to read body of {}: {}", url, e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(len = bytes.len(), "Clip downloaded");
        self.store(url, &bytes).await;

        Ok(bytes.to_vec())
    }
}
