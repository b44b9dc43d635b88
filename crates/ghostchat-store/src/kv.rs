//! The key-value contract shared by session and durable storage.
//!
//! Consumers receive a store as `Arc<dyn KeyValueStore>` instead of
//! reaching for a process-wide singleton, so tests can hand in a fresh
//! one. Every write is broadcast as a [`StorageEvent`]; a removal carries
//! `new_value: None`.

use tokio::sync::broadcast;

use crate::error::Result;

/// Capacity of the change-event channel. Slow subscribers see `Lagged`
/// and should re-read the keys they care about.
pub(crate) const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub new_value: Option<String>,
}

/// Synchronous string key-value storage. Last writer wins.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Returns whether the key existed.
    fn remove(&self, key: &str) -> Result<bool>;

    /// Drop every key. Each removed key is announced individually.
    fn clear(&self) -> Result<()>;

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent>;
}

pub(crate) fn announce(tx: &broadcast::Sender<StorageEvent>, key: &str, new_value: Option<&str>) {
    // No receivers is fine.
    let _ = tx.send(StorageEvent {
        key: key.to_string(),
        new_value: new_value.map(str::to_string),
    });
}
