//! Opaque references to backend-stored binary content.
//!
//! An [`ExternalBlob`] is created either from local bytes (an attachment or
//! avatar about to be uploaded) or from the direct URL the backend hands
//! back once the content is stored. Local blobs may carry a progress
//! callback that the backend stub drives while it consumes the bytes.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Receives whole upload percentages in `0..=100`.
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BlobSource {
    Bytes { data: Bytes },
    Url { url: String },
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ExternalBlob {
    source: BlobSource,
    #[serde(skip)]
    progress: Option<ProgressCallback>,
}

impl ExternalBlob {
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self {
            source: BlobSource::Bytes { data: data.into() },
            progress: None,
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            source: BlobSource::Url { url: url.into() },
            progress: None,
        }
    }

    /// Attach a progress callback, replacing any previous one.
    pub fn with_upload_progress<F>(mut self, on_progress: F) -> Self
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(on_progress));
        self
    }

    /// Forward a percentage to the progress callback, if any.
    pub fn report_progress(&self, percentage: u8) {
        if let Some(cb) = &self.progress {
            cb(percentage.min(100));
        }
    }

    pub fn source(&self) -> &BlobSource {
        &self.source
    }

    /// URL the content can be fetched from. `None` until uploaded.
    pub fn direct_url(&self) -> Option<&str> {
        match &self.source {
            BlobSource::Url { url } => Some(url),
            BlobSource::Bytes { .. } => None,
        }
    }

    /// Local bytes, present only before upload.
    pub fn bytes(&self) -> Option<&Bytes> {
        match &self.source {
            BlobSource::Bytes { data } => Some(data),
            BlobSource::Url { .. } => None,
        }
    }

    pub fn is_uploaded(&self) -> bool {
        matches!(self.source, BlobSource::Url { .. })
    }
}

impl PartialEq for ExternalBlob {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Debug for ExternalBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ExternalBlob");
        match &self.source {
            BlobSource::Bytes { data } => s.field("bytes", &data.len()),
            BlobSource::Url { url } => s.field("url", url),
        };
        s.field("progress", &self.progress.is_some()).finish()
    }
}
