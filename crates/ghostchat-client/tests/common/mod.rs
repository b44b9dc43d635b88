#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ghostchat_client::{
    ChatClient, ClientConfig, ClientError, ImagePreloader, MemoryBackend, Notification,
};
use ghostchat_shared::UserId;
use ghostchat_store::{KeyValueStore, SessionStore};
use tokio::sync::broadcast;

/// Records every URL it is asked to preload; optionally fails.
#[derive(Default)]
pub struct RecordingPreloader {
    pub urls: Mutex<Vec<String>>,
    pub fail: bool,
}

#[async_trait]
impl ImagePreloader for RecordingPreloader {
    async fn preload(&self, url: &str) -> Result<(), ClientError> {
        self.urls.lock().unwrap().push(url.to_string());
        if self.fail {
            return Err(ClientError::Preload(format!("{url} unreachable")));
        }
        Ok(())
    }
}

/// A signed-in client acting as `user` on `backend`, with its own
/// in-memory storage.
pub fn client_for(backend: &MemoryBackend, user: &str) -> ChatClient {
    client_with_storage(backend, user, Arc::new(SessionStore::new()))
}

pub fn client_with_storage(
    backend: &MemoryBackend,
    user: &str,
    durable: Arc<dyn KeyValueStore>,
) -> ChatClient {
    ChatClient::builder(ClientConfig::default())
        .backend(Arc::new(backend.connect(user)), UserId::from(user))
        .durable_storage(durable)
        .preloader(Arc::new(RecordingPreloader::default()))
        .build()
        .unwrap()
}

/// Shared backend plus a client that already has a profile.
pub async fn signed_up(backend: &MemoryBackend, user: &str) -> ChatClient {
    let client = client_for(backend, user);
    client
        .create_profile(user, &capitalize(user), "")
        .await
        .unwrap();
    client
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Every notification received so far.
pub fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}
