//! Session-scoped storage.
//!
//! Lives only as long as the [`SessionStore`] value does, which is the
//! client's notion of a browser session: a new session starts empty.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::broadcast;

use crate::error::{Result, StoreError};
use crate::kv::{announce, KeyValueStore, StorageEvent, EVENT_CAPACITY};

pub struct SessionStore {
    entries: RwLock<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            entries: RwLock::new(HashMap::new()),
            events,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for SessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .insert(key.to_string(), value.to_string());
        announce(&self.events, key, Some(value));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let existed = self
            .entries
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .remove(key)
            .is_some();
        if existed {
            announce(&self.events, key, None);
        }
        Ok(existed)
    }

    fn clear(&self) -> Result<()> {
        let drained: Vec<String> = {
            let mut entries = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
            entries.drain().map(|(k, _)| k).collect()
        };
        for key in drained {
            announce(&self.events, &key, None);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}
