use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::blob::ExternalBlob;

/// Backend timestamp: nanoseconds since the Unix epoch.
pub type Time = u64;

/// Backend-assigned, monotonically increasing message identifier.
pub type MessageId = u64;

pub type Username = String;

pub type RoomId = String;

/// Convert a backend timestamp into a UTC datetime.
pub fn time_to_datetime(time: Time) -> DateTime<Utc> {
    let secs = (time / 1_000_000_000) as i64;
    let nanos = (time % 1_000_000_000) as u32;
    Utc.timestamp_opt(secs, nanos)
        .single()
        .unwrap_or_default()
}

/// Current wall-clock time as a backend timestamp.
pub fn now_time() -> Time {
    Utc::now()
        .timestamp_nanos_opt()
        .map(|n| n.max(0) as u64)
        .unwrap_or_default()
}

// Opaque principal issued by the identity provider, kept in its text form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
    Guest,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
            Self::Guest => "guest",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: UserId,
    /// Unique across the backend, never changed after creation.
    pub username: Username,
    pub display_name: String,
    pub bio: String,
    pub avatar: Option<ExternalBlob>,
    pub is_online: bool,
    pub last_seen: Time,
    pub created_at: Time,
}

/// A message in the global room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    /// Username at send time; profiles may be missing when rendering.
    pub sender_username: Username,
    pub content: String,
    pub attachment: Option<ExternalBlob>,
    pub edited: bool,
    pub created_at: Time,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessage {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub sender_username: Username,
    pub content: String,
    pub attachment: Option<ExternalBlob>,
    pub edited: bool,
    pub created_at: Time,
}

/// Per-conversation aggregate computed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessageSummary {
    pub thread_id: u64,
    pub participant1: UserId,
    pub participant2: UserId,
    pub participant1_username: Username,
    pub participant2_username: Username,
    pub last_message: Option<DirectMessage>,
    pub total_messages: u64,
    pub unread_count: u64,
    pub created_at: Time,
    pub last_updated: Time,
}

impl DirectMessageSummary {
    /// The participant that is not `me`.
    pub fn peer_of(&self, me: &UserId) -> &UserId {
        if &self.participant1 == me {
            &self.participant2
        } else {
            &self.participant1
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessageStats {
    pub messages: Vec<DirectMessage>,
    pub total_count: u64,
    pub unread_count: u64,
    pub last_message_time: Option<Time>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendStatus {
    pub backend_time: Time,
    pub startup_time: Time,
    pub message_count: u64,
    pub user_count: u64,
}
