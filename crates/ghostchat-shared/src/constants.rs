/// Application name
pub const APP_NAME: &str = "Ghost Chat";

/// Room identifier of the single global chat room
pub const GLOBAL_ROOM_ID: &str = "global";

/// Message list polling interval in milliseconds
pub const POLL_INTERVAL_MS: u64 = 3_000;

/// Maximum size of chat attachments, avatars and the site logo (5 MiB)
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Maximum size of a general admin image upload (10 MiB)
pub const MAX_ADMIN_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// MIME types accepted for attachments and avatars
pub const ALLOWED_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// File extensions matching `ALLOWED_IMAGE_TYPES`
pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Durable storage key holding the last resolved site logo URL
pub const SITE_LOGO_CACHE_KEY: &str = "site_logo_url";

/// Session storage key holding the admin unlock flag
pub const ADMIN_UNLOCK_KEY: &str = "admin_unlocked_session";

/// Shared secret for the advisory admin unlock. Lives in client code on
/// purpose: the backend role check is the real gate.
pub const ADMIN_UNLOCK_SECRET: &str = "DexGod";

/// Logo shown when the backend has none and nothing is cached
pub const DEFAULT_LOGO_URL: &str = "/assets/generated/app-logo-dexfans.dim_512x512.png";

/// Avatar shown for profiles without an uploaded avatar
pub const DEFAULT_AVATAR_URL: &str = "/assets/generated/default-avatar.dim_256x256.png";

/// Hold duration before a delete affordance appears on an own message
pub const LONG_PRESS_MS: u64 = 500;
