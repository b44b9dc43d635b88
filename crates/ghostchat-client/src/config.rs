//! Client configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the client can start with zero
//! configuration for local development.

use std::path::PathBuf;
use std::time::Duration;

use ghostchat_shared::constants::{DEFAULT_LOGO_URL, MAX_FILE_SIZE, POLL_INTERVAL_MS};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How often message lists are refetched.
    /// Env: `GHOSTCHAT_POLL_INTERVAL_MS`
    /// Default: 3000 ms
    pub poll_interval: Duration,

    /// Largest attachment / avatar / logo accepted before upload.
    /// Env: `GHOSTCHAT_MAX_UPLOAD_BYTES`
    /// Default: 5 MiB
    pub max_upload_size: usize,

    /// Location of the durable storage database.
    /// Env: `GHOSTCHAT_STORAGE_PATH`
    /// Default: `None` (platform data directory)
    pub storage_path: Option<PathBuf>,

    /// Logo shown when the backend has none and nothing is cached.
    /// Env: `GHOSTCHAT_DEFAULT_LOGO_URL`
    pub default_logo_url: String,

    /// Upper bound for warming the image cache after a logo change.
    /// Env: `GHOSTCHAT_PRELOAD_TIMEOUT_MS`
    /// Default: 10000 ms
    pub preload_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
            max_upload_size: MAX_FILE_SIZE,
            storage_path: None,
            default_logo_url: DEFAULT_LOGO_URL.to_string(),
            preload_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(ms) = parse_number(&lookup, "GHOSTCHAT_POLL_INTERVAL_MS") {
            if ms == 0 {
                tracing::warn!("GHOSTCHAT_POLL_INTERVAL_MS must be positive, using default");
            } else {
                config.poll_interval = Duration::from_millis(ms);
            }
        }

        if let Some(bytes) = parse_number(&lookup, "GHOSTCHAT_MAX_UPLOAD_BYTES") {
            config.max_upload_size = bytes as usize;
        }

        if let Some(path) = lookup("GHOSTCHAT_STORAGE_PATH") {
            if !path.is_empty() {
                config.storage_path = Some(PathBuf::from(path));
            }
        }

        if let Some(url) = lookup("GHOSTCHAT_DEFAULT_LOGO_URL") {
            if !url.is_empty() {
                config.default_logo_url = url;
            }
        }

        if let Some(ms) = parse_number(&lookup, "GHOSTCHAT_PRELOAD_TIMEOUT_MS") {
            config.preload_timeout = Duration::from_millis(ms);
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }
}

fn parse_number(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<u64> {
    let raw = lookup(name)?;
    match raw.trim().parse::<u64>() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Invalid number, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.max_upload_size, 5 * 1024 * 1024);
        assert!(config.storage_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("GHOSTCHAT_POLL_INTERVAL_MS", "500"),
            ("GHOSTCHAT_STORAGE_PATH", "/tmp/gc.db"),
            ("GHOSTCHAT_DEFAULT_LOGO_URL", "/logo.png"),
        ]));
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.storage_path, Some(PathBuf::from("/tmp/gc.db")));
        assert_eq!(config.default_logo_url, "/logo.png");
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("GHOSTCHAT_POLL_INTERVAL_MS", "soon"),
            ("GHOSTCHAT_MAX_UPLOAD_BYTES", "0x10"),
        ]));
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.max_upload_size, 5 * 1024 * 1024);

        let zero = ClientConfig::from_lookup(lookup_from(&[("GHOSTCHAT_POLL_INTERVAL_MS", "0")]));
        assert_eq!(zero.poll_interval, Duration::from_secs(3));
    }
}
