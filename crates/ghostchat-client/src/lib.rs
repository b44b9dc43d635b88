//! # ghostchat-client
//!
//! Client core for Ghost Chat: everything between the UI and the remote
//! backend. Reads are cached per [`QueryKey`] and polled where the UI shows
//! live lists; writes invalidate what they touch and report through
//! notifications.

pub mod access;
pub mod backend;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod logo_cache;
pub mod mutation;
pub mod navigation;
pub mod poll;
pub mod query;
pub mod unlock;
pub mod upload;
pub mod views;

use tracing_subscriber::{fmt, EnvFilter};

pub use access::{AdminAccess, RoleCheck};
pub use backend::memory::MemoryBackend;
pub use backend::Backend;
pub use client::{ChatClient, ChatClientBuilder};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use events::{Notification, NotificationLevel, Notifier};
pub use logo_cache::{HttpImagePreloader, ImagePreloader, NoopPreloader, SiteLogoCache};
pub use navigation::{View, ViewStack};
pub use poll::QueryWatch;
pub use query::{QueryClient, QueryKey, QueryState, QueryStatus};
pub use unlock::{AdminUnlock, UnlockState};
pub use upload::{ComposeTarget, Composer, LocalFile, UploadProgress};
pub use views::AppPhase;

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the
/// default filter. Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ghostchat_client=debug,ghostchat_store=info,warn"));

    let installed = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("Starting {}", ghostchat_shared::constants::APP_NAME);
    }
}
