//! # ghostchat-store
//!
//! Client-side key-value storage for Ghost Chat.
//!
//! Two flavours share the [`KeyValueStore`] trait:
//! - [`SessionStore`] keeps values in memory for one session (the admin
//!   unlock flag lives here),
//! - [`DurableStore`] persists values in SQLite across restarts (the cached
//!   site logo URL lives here).

pub mod database;
pub mod kv;
pub mod migrations;
pub mod session;

mod error;

pub use database::DurableStore;
pub use error::{Result, StoreError};
pub use kv::{KeyValueStore, StorageEvent};
pub use session::SessionStore;
