//! File uploads: validation, progress, and the message composer.
//!
//! Every upload path validates the file locally first; a rejected file is
//! reported to the user and never reaches the backend.

use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info};

use ghostchat_shared::validation::{
    mime_from_extension, ImagePolicy, ADMIN_IMAGE_POLICY, ATTACHMENT_POLICY, LOGO_POLICY,
};
use ghostchat_shared::{ExternalBlob, UserId};

use crate::client::ChatClient;
use crate::error::{ClientError, Result};

const UNKNOWN_MIME: &str = "application/octet-stream";

/// A file picked by the user, fully read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = mime_from_extension(&name).unwrap_or(UNKNOWN_MIME);
        debug!(name = %name, mime_type, size = bytes.len(), "Read local file");
        Ok(Self::new(name, mime_type, bytes))
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Wrap the bytes in a blob that reports upload progress to `progress`.
    pub fn to_blob(&self, progress: &UploadProgress) -> ExternalBlob {
        let sink = progress.clone();
        ExternalBlob::from_bytes(self.bytes.clone()).with_upload_progress(move |pct| sink.set(pct))
    }
}

/// Upload percentage shared between the uploading blob and the UI.
#[derive(Debug, Clone, Default)]
pub struct UploadProgress {
    value: Arc<AtomicU8>,
}

impl UploadProgress {
    pub fn get(&self) -> u8 {
        self.value.load(Ordering::SeqCst)
    }

    fn set(&self, pct: u8) {
        self.value.store(pct.min(100), Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.set(0);
    }

    /// The bar shows only while an upload is partway through.
    pub fn is_visible(&self) -> bool {
        let pct = self.get();
        pct > 0 && pct < 100
    }
}

impl ChatClient {
    /// Chat attachments and avatars.
    pub fn attachment_policy(&self) -> ImagePolicy {
        ATTACHMENT_POLICY.with_max_size(self.config.max_upload_size)
    }

    /// Validate locally, notifying the user on rejection.
    pub fn check_upload(&self, file: &LocalFile, policy: ImagePolicy) -> Result<()> {
        policy.check(&file.mime_type, file.size()).map_err(|e| {
            debug!(name = %file.name, error = %e, "Upload rejected");
            self.notifier.error(e.to_string());
            ClientError::from(e)
        })
    }

    pub async fn upload_avatar_file(&self, file: &LocalFile, progress: &UploadProgress) -> Result<()> {
        self.check_upload(file, self.attachment_policy())?;
        let result = self.upload_avatar(file.to_blob(progress)).await;
        progress.reset();
        result
    }

    pub async fn upload_site_logo_file(
        &self,
        file: &LocalFile,
        progress: &UploadProgress,
    ) -> Result<ExternalBlob> {
        self.check_upload(file, LOGO_POLICY)?;
        let result = self.set_site_logo(file.to_blob(progress)).await;
        progress.reset();
        result
    }

    /// Upload an arbitrary image from the admin panel and return its URL.
    pub async fn upload_admin_image(
        &self,
        file: &LocalFile,
        progress: &UploadProgress,
    ) -> Result<String> {
        self.check_upload(file, ADMIN_IMAGE_POLICY)?;
        let result = self.upload_image(file.to_blob(progress)).await;
        progress.reset();
        if let Ok(url) = &result {
            info!(name = %file.name, url = %url, "Admin image uploaded");
        }
        result
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeTarget {
    Global,
    Direct(UserId),
}

/// Draft state for one message input.
pub struct Composer {
    client: ChatClient,
    target: ComposeTarget,
    draft: String,
    attachment: Option<LocalFile>,
    progress: UploadProgress,
}

impl Composer {
    pub fn new(client: ChatClient, target: ComposeTarget) -> Self {
        Self {
            client,
            target,
            draft: String::new(),
            attachment: None,
            progress: UploadProgress::default(),
        }
    }

    pub fn target(&self) -> &ComposeTarget {
        &self.target
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn attachment(&self) -> Option<&LocalFile> {
        self.attachment.as_ref()
    }

    /// Returns whether the file was accepted.
    pub fn select_attachment(&mut self, file: LocalFile) -> bool {
        if self.client.check_upload(&file, self.client.attachment_policy()).is_err() {
            return false;
        }
        self.attachment = Some(file);
        true
    }

    pub fn clear_attachment(&mut self) {
        self.attachment = None;
    }

    pub fn progress(&self) -> &UploadProgress {
        &self.progress
    }

    pub fn is_pending(&self) -> bool {
        let mutations = self.client.mutations();
        match self.target {
            ComposeTarget::Global => mutations.send_message.is_pending(),
            ComposeTarget::Direct(_) => mutations.send_direct_message.is_pending(),
        }
    }

    pub fn can_send(&self) -> bool {
        self.has_content() && !self.is_pending()
    }

    fn has_content(&self) -> bool {
        !self.draft.trim().is_empty() || self.attachment.is_some()
    }

    /// Send the draft. `Ok(false)` when there was nothing to send.
    ///
    /// The draft and attachment are cleared only on success, so a failed
    /// send can be retried as is.
    pub async fn send(&mut self) -> Result<bool> {
        if !self.has_content() {
            return Ok(false);
        }

        let content = self.draft.trim().to_string();
        let blob = self.attachment.as_ref().map(|f| f.to_blob(&self.progress));
        let result = match &self.target {
            ComposeTarget::Global => self.client.send_message(&content, blob).await,
            ComposeTarget::Direct(peer) => {
                self.client.send_direct_message(peer, &content, blob).await
            }
        };

        self.progress.reset();
        result?;
        self.draft.clear();
        self.attachment = None;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn progress_visibility_excludes_bounds() {
        let progress = UploadProgress::default();
        assert!(!progress.is_visible());
        progress.set(50);
        assert!(progress.is_visible());
        progress.set(100);
        assert!(!progress.is_visible());
        progress.reset();
        assert_eq!(progress.get(), 0);
    }

    #[test]
    fn blob_reports_into_progress() {
        let progress = UploadProgress::default();
        let file = LocalFile::new("a.png", "image/png", vec![0u8; 4]);
        let blob = file.to_blob(&progress);
        blob.report_progress(75);
        assert_eq!(progress.get(), 75);
    }

    #[tokio::test]
    async fn reads_file_and_guesses_mime() {
        let mut tmp = tempfile::Builder::new().suffix(".webp").tempfile().unwrap();
        tmp.write_all(b"RIFF....WEBP").unwrap();

        let file = LocalFile::from_path(tmp.path()).await.unwrap();
        assert_eq!(file.mime_type, "image/webp");
        assert_eq!(file.size(), 12);
    }

    #[tokio::test]
    async fn unknown_extension_is_octet_stream() {
        let tmp = NamedTempFile::new().unwrap();
        let file = LocalFile::from_path(tmp.path()).await.unwrap();
        assert_eq!(file.mime_type, UNKNOWN_MIME);
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let err = LocalFile::from_path("/definitely/not/here.png").await.unwrap_err();
        assert!(matches!(err, ClientError::Io(_)));
    }
}
