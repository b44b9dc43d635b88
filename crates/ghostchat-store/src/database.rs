//! Durable per-user storage.
//!
//! The [`DurableStore`] owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation. Values survive restarts
//! until explicitly removed, the way browser local storage does.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::broadcast;

use crate::error::{Result, StoreError};
use crate::kv::{announce, KeyValueStore, StorageEvent, EVENT_CAPACITY};
use crate::migrations;

/// Key-value store backed by a single SQLite table.
pub struct DurableStore {
    conn: Mutex<Connection>,
    events: broadcast::Sender<StorageEvent>,
}

impl DurableStore {
    /// Open (or create) the default client database.
    ///
    /// The database file is placed in the platform-appropriate data directory:
    /// - Linux:   `~/.local/share/ghostchat/ghostchat.db`
    /// - macOS:   `~/Library/Application Support/com.ghostchat.ghostchat/ghostchat.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\ghostchat\ghostchat\data\ghostchat.db`
    pub fn new() -> Result<Self> {
        let path = default_path()?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        tracing::info!(path = %path.display(), "opening durable storage");
        Self::open_at(&path)
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database. Nothing outlives the value.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrations::run_migrations(&conn)?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            conn: Mutex::new(conn),
            events,
        })
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn()
            .ok()
            .and_then(|c| c.path().filter(|p| !p.is_empty()).map(PathBuf::from))
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

/// Platform data-directory location of the durable database.
pub fn default_path() -> Result<PathBuf> {
    let project_dirs =
        ProjectDirs::from("com", "ghostchat", "ghostchat").ok_or(StoreError::NoDataDir)?;
    Ok(project_dirs.data_dir().join("ghostchat.db"))
}

impl KeyValueStore for DurableStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()?
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        announce(&self.events, key, Some(value));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let affected = self
            .conn()?
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        if affected > 0 {
            announce(&self.events, key, None);
        }
        Ok(affected > 0)
    }

    fn clear(&self) -> Result<()> {
        let keys = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare("SELECT key FROM kv")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut keys = Vec::new();
            for row in rows {
                keys.push(row?);
            }
            conn.execute("DELETE FROM kv", [])?;
            keys
        };
        for key in keys {
            announce(&self.events, &key, None);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}
