//! The client handle the UI layer holds.
//!
//! [`ChatClient`] bundles the backend stub with the local services (query
//! cache, notifications, storage-backed caches) and is cheap to clone. The
//! operations themselves live in [`crate::commands`], grouped by domain.

use std::future::Future;
use std::sync::Arc;

use tracing::info;

use ghostchat_shared::{BackendError, UserId};
use ghostchat_store::{DurableStore, KeyValueStore, SessionStore};

use crate::backend::Backend;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::events::{Notification, Notifier};
use crate::logo_cache::{HttpImagePreloader, ImagePreloader, SiteLogoCache};
use crate::mutation::Mutations;
use crate::query::QueryClient;
use crate::unlock::AdminUnlock;

#[derive(Clone)]
pub struct ChatClient {
    pub(crate) backend: Option<Arc<dyn Backend>>,
    pub(crate) identity: Option<UserId>,
    pub(crate) queries: QueryClient,
    pub(crate) notifier: Notifier,
    pub(crate) logo_cache: SiteLogoCache,
    pub(crate) unlock: AdminUnlock,
    pub(crate) preloader: Arc<dyn ImagePreloader>,
    pub(crate) config: ClientConfig,
    pub(crate) mutations: Mutations,
}

impl ChatClient {
    pub fn builder(config: ClientConfig) -> ChatClientBuilder {
        ChatClientBuilder {
            config,
            backend: None,
            identity: None,
            durable: None,
            session: None,
            preloader: None,
        }
    }

    /// The backend stub, or "Actor not available" when signed out.
    pub(crate) fn actor(&self) -> Result<Arc<dyn Backend>> {
        self.backend
            .clone()
            .ok_or(ClientError::Backend(BackendError::Unavailable))
    }

    /// A `'static` fetcher running `load` against a clone of this client.
    pub(crate) fn loader<L, Fut>(&self, load: L) -> impl Fn() -> Fut + Send + Sync + 'static
    where
        L: Fn(ChatClient) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
    {
        let client = self.clone();
        move || load(client.clone())
    }

    pub fn identity(&self) -> Option<&UserId> {
        self.identity.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.is_some() && self.backend.is_some()
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    pub fn notifications(&self) -> tokio::sync::broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    pub fn mutations(&self) -> &Mutations {
        &self.mutations
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn logo_cache(&self) -> &SiteLogoCache {
        &self.logo_cache
    }

    pub fn admin_gate(&self) -> &AdminUnlock {
        &self.unlock
    }
}

pub struct ChatClientBuilder {
    config: ClientConfig,
    backend: Option<Arc<dyn Backend>>,
    identity: Option<UserId>,
    durable: Option<Arc<dyn KeyValueStore>>,
    session: Option<Arc<dyn KeyValueStore>>,
    preloader: Option<Arc<dyn ImagePreloader>>,
}

impl ChatClientBuilder {
    /// Act as `identity` through `backend`. Without this the client is
    /// signed out.
    pub fn backend(mut self, backend: Arc<dyn Backend>, identity: UserId) -> Self {
        self.backend = Some(backend);
        self.identity = Some(identity);
        self
    }

    pub fn durable_storage(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.durable = Some(store);
        self
    }

    pub fn session_storage(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.session = Some(store);
        self
    }

    pub fn preloader(mut self, preloader: Arc<dyn ImagePreloader>) -> Self {
        self.preloader = Some(preloader);
        self
    }

    pub fn build(self) -> Result<ChatClient> {
        let durable: Arc<dyn KeyValueStore> = match self.durable {
            Some(store) => store,
            None => match &self.config.storage_path {
                Some(path) => Arc::new(DurableStore::open_at(path)?),
                None => Arc::new(DurableStore::new()?),
            },
        };
        let session: Arc<dyn KeyValueStore> = match self.session {
            Some(store) => store,
            None => Arc::new(SessionStore::new()),
        };
        let preloader: Arc<dyn ImagePreloader> = match self.preloader {
            Some(p) => p,
            None => Arc::new(HttpImagePreloader::new(self.config.preload_timeout)?),
        };

        info!(
            signed_in = self.identity.is_some(),
            poll_ms = self.config.poll_interval.as_millis() as u64,
            "Chat client ready"
        );

        Ok(ChatClient {
            backend: self.backend,
            identity: self.identity,
            queries: QueryClient::new(),
            notifier: Notifier::new(),
            logo_cache: SiteLogoCache::new(durable),
            unlock: AdminUnlock::new(session),
            preloader,
            config: self.config,
            mutations: Mutations::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::logo_cache::NoopPreloader;
    use tempfile::TempDir;

    #[test]
    fn signed_out_client_reports_actor_unavailable() {
        let client = ChatClient::builder(ClientConfig::default())
            .durable_storage(Arc::new(SessionStore::new()))
            .preloader(Arc::new(NoopPreloader))
            .build()
            .unwrap();
        assert!(!client.is_signed_in());
        let err = client.actor().err().unwrap();
        assert_eq!(err.to_string(), "Actor not available");
    }

    #[test]
    fn durable_storage_opens_at_configured_path() {
        let dir = TempDir::new().unwrap();
        let config = ClientConfig {
            storage_path: Some(dir.path().join("client.db")),
            ..ClientConfig::default()
        };
        let backend = MemoryBackend::new("alice");
        let client = ChatClient::builder(config)
            .backend(Arc::new(backend), UserId::from("alice"))
            .preloader(Arc::new(NoopPreloader))
            .build()
            .unwrap();
        assert!(client.is_signed_in());
        assert!(dir.path().join("client.db").exists());
    }
}
