//! Durable mirror of the site logo URL, plus image pre-warming.
//!
//! The logo is shown before the backend answers by reading the last known
//! URL from durable storage. Storage failures never surface to the user:
//! they are logged and treated as a cache miss.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use ghostchat_shared::constants::SITE_LOGO_CACHE_KEY;
use ghostchat_store::KeyValueStore;

use crate::error::{ClientError, Result};

#[derive(Clone)]
pub struct SiteLogoCache {
    storage: Arc<dyn KeyValueStore>,
}

impl SiteLogoCache {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    pub fn get(&self) -> Option<String> {
        match self.storage.get(SITE_LOGO_CACHE_KEY) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Failed to read cached site logo");
                None
            }
        }
    }

    /// Returns whether the URL was stored.
    pub fn set(&self, url: &str) -> bool {
        match self.storage.set(SITE_LOGO_CACHE_KEY, url) {
            Ok(()) => {
                debug!(url, "Cached site logo");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to cache site logo");
                false
            }
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.storage.remove(SITE_LOGO_CACHE_KEY) {
            warn!(error = %e, "Failed to clear cached site logo");
        }
    }
}

/// Loads an image ahead of display so the next render hits a warm cache.
#[async_trait]
pub trait ImagePreloader: Send + Sync {
    async fn preload(&self, url: &str) -> Result<()>;
}

/// Preloads over HTTP(S); other schemes are skipped.
pub struct HttpImagePreloader {
    client: reqwest::Client,
}

impl HttpImagePreloader {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Preload(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImagePreloader for HttpImagePreloader {
    async fn preload(&self, url: &str) -> Result<()> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            debug!(url, "Skipping preload for non-HTTP url");
            return Ok(());
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::Preload(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::Preload(format!(
                "{url} returned {}",
                response.status()
            )));
        }

        // Read the body so the transfer completes.
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Preload(e.to_string()))?;
        debug!(url, size = body.len(), "Preloaded image");
        Ok(())
    }
}

/// Does nothing. For headless use and tests.
pub struct NoopPreloader;

#[async_trait]
impl ImagePreloader for NoopPreloader {
    async fn preload(&self, _url: &str) -> Result<()> {
        Ok(())
    }
}
