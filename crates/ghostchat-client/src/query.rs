//! Keyed cache of remote query results.
//!
//! Each [`QueryKey`] owns one cached value plus its fetch bookkeeping.
//! Concurrent refreshes of the same key share a single backend call: the
//! first caller spawns the fetch, later callers await the same shared
//! future. Invalidating a key marks it stale, detaches any fetch still in
//! flight (its result is handed to its awaiting callers but never written
//! to the cache) and notifies observers so they refetch.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::broadcast;
use tracing::{debug, trace};

use ghostchat_shared::UserId;

use crate::error::{ClientError, Result};

/// Type-erased cached value.
type AnyValue = Arc<dyn Any + Send + Sync>;

type SharedFetch = Shared<BoxFuture<'static, Result<AnyValue>>>;

const EVENT_CAPACITY: usize = 128;

/// Identifies one piece of remote state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    GlobalMessages,
    DirectMessages(UserId),
    DirectMessageThreads,
    CurrentUserProfile,
    AllProfiles,
    UserProfile(UserId),
    SiteLogo,
    IsCallerAdmin,
    CallerRole,
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GlobalMessages => f.write_str("globalMessages"),
            Self::DirectMessages(peer) => write!(f, "directMessages/{peer}"),
            Self::DirectMessageThreads => f.write_str("directMessageThreads"),
            Self::CurrentUserProfile => f.write_str("currentUserProfile"),
            Self::AllProfiles => f.write_str("allProfiles"),
            Self::UserProfile(user) => write!(f, "userProfile/{user}"),
            Self::SiteLogo => f.write_str("siteLogo"),
            Self::IsCallerAdmin => f.write_str("isCallerAdmin"),
            Self::CallerRole => f.write_str("callerRole"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Never fetched.
    Idle,
    /// First fetch in progress, no data yet.
    Loading,
    Success,
    /// The most recent fetch failed. Earlier data, if any, is still cached.
    Error,
}

/// Snapshot of a key's bookkeeping.
#[derive(Debug, Clone)]
pub struct QueryState {
    pub status: QueryStatus,
    pub has_data: bool,
    pub is_fetching: bool,
    pub is_stale: bool,
    pub error: Option<ClientError>,
    pub updated_at: Option<Instant>,
    /// Backend calls started for this key.
    pub fetch_count: u64,
}

/// Cache change announced to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryEvent {
    /// The key went stale; observers should refetch.
    Invalidated(QueryKey),
    /// The key was written directly.
    Updated(QueryKey),
    /// Every key was dropped.
    Cleared,
}

#[derive(Default)]
struct Entry {
    data: Option<AnyValue>,
    stale: bool,
    error: Option<ClientError>,
    updated_at: Option<Instant>,
    in_flight: Option<(u64, SharedFetch)>,
    fetch_count: u64,
}

impl Entry {
    fn snapshot(&self) -> QueryState {
        let is_fetching = self.in_flight.is_some();
        let status = if self.error.is_some() {
            QueryStatus::Error
        } else if self.data.is_some() {
            QueryStatus::Success
        } else if is_fetching {
            QueryStatus::Loading
        } else {
            QueryStatus::Idle
        };
        QueryState {
            status,
            has_data: self.data.is_some(),
            is_fetching,
            is_stale: self.stale || self.data.is_none(),
            error: self.error.clone(),
            updated_at: self.updated_at,
            fetch_count: self.fetch_count,
        }
    }
}

struct Inner {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    events: broadcast::Sender<QueryEvent>,
    next_fetch_id: AtomicU64,
}

/// Shared handle to the query cache. Cloning is cheap.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<Inner>,
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryClient {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                events,
                next_fetch_id: AtomicU64::new(1),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn announce(&self, event: QueryEvent) {
        // No receivers is fine.
        let _ = self.inner.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueryEvent> {
        self.inner.events.subscribe()
    }

    /// Cached value for `key`, stale or not.
    pub fn cached<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let data = self.lock().get(key)?.data.clone()?;
        data.downcast::<T>().ok()
    }

    /// Fetch `key` from the backend, joining a fetch already in flight.
    ///
    /// `fetcher` is only invoked when no fetch is running. The fetch runs on
    /// its own task, so it completes and updates the cache even if every
    /// caller stops waiting.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let shared = {
            let mut entries = self.lock();
            let entry = entries.entry(key.clone()).or_default();
            match &entry.in_flight {
                Some((_, running)) => {
                    trace!(key = %key, "Joining in-flight fetch");
                    running.clone()
                }
                None => {
                    let id = self.inner.next_fetch_id.fetch_add(1, Ordering::Relaxed);
                    let shared = self.spawn_fetch(key.clone(), id, fetcher());
                    entry.in_flight = Some((id, shared.clone()));
                    entry.fetch_count += 1;
                    debug!(key = %key, fetch = id, "Fetching");
                    shared
                }
            }
        };

        let value = shared.await?;
        value
            .downcast::<T>()
            .map_err(|_| ClientError::TypeMismatch(key.to_string()))
    }

    fn spawn_fetch<T, Fut>(&self, key: QueryKey, id: u64, fut: Fut) -> SharedFetch
    where
        T: Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let this = self.clone();
        let settle_key = key.clone();
        let task = tokio::spawn(async move {
            let outcome = fut.await.map(|v| Arc::new(v) as AnyValue);
            this.settle(&settle_key, id, &outcome);
            outcome
        });

        let this = self.clone();
        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let outcome = Err(ClientError::Task(e.to_string()));
                    this.settle(&key, id, &outcome);
                    outcome
                }
            }
        }
        .boxed()
        .shared()
    }

    fn settle(&self, key: &QueryKey, id: u64, outcome: &Result<AnyValue>) {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(key) else {
            trace!(key = %key, fetch = id, "Dropping result for cleared key");
            return;
        };
        if !matches!(&entry.in_flight, Some((current, _)) if *current == id) {
            trace!(key = %key, fetch = id, "Dropping superseded result");
            return;
        }
        entry.in_flight = None;
        match outcome {
            Ok(value) => {
                entry.data = Some(value.clone());
                entry.stale = false;
                entry.error = None;
                entry.updated_at = Some(Instant::now());
            }
            Err(e) => {
                debug!(key = %key, error = %e, "Fetch failed");
                entry.error = Some(e.clone());
            }
        }
    }

    /// Cached value if fresh, otherwise a fetch.
    pub async fn ensure<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let fresh = {
            let entries = self.lock();
            entries
                .get(&key)
                .filter(|e| !e.stale)
                .and_then(|e| e.data.clone())
        };
        match fresh.map(|data| data.downcast::<T>()) {
            Some(Ok(value)) => Ok(value),
            Some(Err(_)) => Err(ClientError::TypeMismatch(key.to_string())),
            None => self.fetch(key, fetcher).await,
        }
    }

    /// Mark `key` stale and tell observers to refetch.
    pub fn invalidate(&self, key: &QueryKey) {
        {
            let mut entries = self.lock();
            if let Some(entry) = entries.get_mut(key) {
                entry.stale = true;
                entry.in_flight = None;
            }
        }
        debug!(key = %key, "Invalidated");
        self.announce(QueryEvent::Invalidated(key.clone()));
    }

    /// Invalidate every cached key matching `predicate`.
    pub fn invalidate_where(&self, predicate: impl Fn(&QueryKey) -> bool) {
        let keys: Vec<QueryKey> = self
            .lock()
            .keys()
            .filter(|k| predicate(k))
            .cloned()
            .collect();
        for key in &keys {
            self.invalidate(key);
        }
    }

    /// Write a value directly, superseding any fetch in flight.
    pub fn set_data<T: Send + Sync + 'static>(&self, key: QueryKey, value: T) {
        {
            let mut entries = self.lock();
            let entry = entries.entry(key.clone()).or_default();
            entry.data = Some(Arc::new(value));
            entry.stale = false;
            entry.error = None;
            entry.updated_at = Some(Instant::now());
            entry.in_flight = None;
        }
        self.announce(QueryEvent::Updated(key));
    }

    pub fn remove(&self, key: &QueryKey) {
        self.lock().remove(key);
    }

    /// Drop every key. Fetches still in flight are discarded on completion.
    pub fn clear(&self) {
        self.lock().clear();
        debug!("Query cache cleared");
        self.announce(QueryEvent::Cleared);
    }

    pub fn state(&self, key: &QueryKey) -> QueryState {
        self.lock()
            .get(key)
            .map(Entry::snapshot)
            .unwrap_or_else(|| Entry::default().snapshot())
    }
}
