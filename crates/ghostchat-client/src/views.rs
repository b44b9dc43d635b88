//! Presentation view models derived from cached backend data.
//!
//! Pure functions only; nothing here talks to the backend.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use ghostchat_shared::constants::{DEFAULT_AVATAR_URL, LONG_PRESS_MS};
use ghostchat_shared::{
    time_to_datetime, DirectMessage, ExternalBlob, Message, MessageId, Time, UserId, UserProfile,
};

// -- Avatars ----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarView {
    pub url: String,
    pub initials: String,
    pub alt: String,
}

impl AvatarView {
    pub fn for_profile(profile: Option<&UserProfile>) -> Self {
        let url = profile
            .and_then(|p| p.avatar.as_ref())
            .and_then(ExternalBlob::direct_url)
            .unwrap_or(DEFAULT_AVATAR_URL)
            .to_string();
        let display_name = profile.map(|p| p.display_name.as_str()).unwrap_or("");

        let initials: String = display_name.chars().take(2).collect::<String>().to_uppercase();
        Self {
            url,
            initials: if initials.is_empty() { "??".into() } else { initials },
            alt: if display_name.is_empty() { "User".into() } else { display_name.to_string() },
        }
    }
}

// -- Message rows -----------------------------------------------------------

/// Fields shared by global and direct messages.
pub trait ChatMessage {
    fn id(&self) -> MessageId;
    fn sender_id(&self) -> &UserId;
    fn sender_username(&self) -> &str;
    fn content(&self) -> &str;
    fn attachment(&self) -> Option<&ExternalBlob>;
    fn edited(&self) -> bool;
    fn created_at(&self) -> Time;
}

macro_rules! impl_chat_message {
    ($ty:ty) => {
        impl ChatMessage for $ty {
            fn id(&self) -> MessageId {
                self.id
            }
            fn sender_id(&self) -> &UserId {
                &self.sender_id
            }
            fn sender_username(&self) -> &str {
                &self.sender_username
            }
            fn content(&self) -> &str {
                &self.content
            }
            fn attachment(&self) -> Option<&ExternalBlob> {
                self.attachment.as_ref()
            }
            fn edited(&self) -> bool {
                self.edited
            }
            fn created_at(&self) -> Time {
                self.created_at
            }
        }
    };
}

impl_chat_message!(Message);
impl_chat_message!(DirectMessage);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow {
    pub id: MessageId,
    pub sender_id: UserId,
    /// Current display name, or the username captured at send time.
    pub sender_name: String,
    pub avatar: AvatarView,
    pub content: String,
    pub attachment_url: Option<String>,
    pub edited: bool,
    pub is_own: bool,
    pub time_label: String,
}

pub fn message_rows<M: ChatMessage>(
    messages: &[M],
    profiles: &[UserProfile],
    me: Option<&UserId>,
    now: DateTime<Utc>,
) -> Vec<MessageRow> {
    messages
        .iter()
        .map(|m| {
            let profile = profiles.iter().find(|p| &p.user_id == m.sender_id());
            MessageRow {
                id: m.id(),
                sender_id: m.sender_id().clone(),
                sender_name: profile
                    .map(|p| p.display_name.clone())
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| m.sender_username().to_string()),
                avatar: AvatarView::for_profile(profile),
                content: m.content().to_string(),
                attachment_url: m
                    .attachment()
                    .and_then(ExternalBlob::direct_url)
                    .map(str::to_string),
                edited: m.edited(),
                is_own: me == Some(m.sender_id()),
                time_label: relative_time(time_to_datetime(m.created_at()), now),
            }
        })
        .collect()
}

/// Only the sender may pick a global message for deletion.
pub fn can_delete(message: &Message, me: Option<&UserId>) -> bool {
    me == Some(&message.sender_id)
}

/// Press-and-hold selection of a message for deletion.
#[derive(Debug, Default)]
pub struct LongPress {
    pressed: Option<(MessageId, Instant)>,
    selected: Option<MessageId>,
}

impl LongPress {
    const HOLD: Duration = Duration::from_millis(LONG_PRESS_MS);

    /// Presses on other people's messages are ignored.
    pub fn press_start(&mut self, id: MessageId, is_own: bool, at: Instant) {
        if is_own {
            self.pressed = Some((id, at));
        }
    }

    /// Selects the message if it was held long enough.
    pub fn press_end(&mut self, at: Instant) {
        if let Some((id, started)) = self.pressed.take() {
            if at.saturating_duration_since(started) >= Self::HOLD {
                self.selected = Some(id);
            }
        }
    }

    pub fn selected(&self) -> Option<MessageId> {
        self.selected
    }

    pub fn clear(&mut self) {
        self.pressed = None;
        self.selected = None;
    }
}

// -- Relative time ----------------------------------------------------------

const MINUTES_IN_DAY: i64 = 1_440;
const MINUTES_IN_MONTH: i64 = 43_200;
const MINUTES_IN_TWO_MONTHS: i64 = 86_400;

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

/// "5 minutes ago", "about 2 hours ago", "in 3 days".
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    let past = seconds >= 0;
    let seconds = seconds.abs();
    let minutes = (seconds as f64 / 60.0).round() as i64;

    let distance = if minutes < 2 {
        if minutes == 0 {
            "less than a minute".to_string()
        } else {
            plural(minutes, "minute")
        }
    } else if minutes < 45 {
        plural(minutes, "minute")
    } else if minutes < 90 {
        "about 1 hour".to_string()
    } else if minutes < MINUTES_IN_DAY {
        let hours = (minutes as f64 / 60.0).round() as i64;
        format!("about {}", plural(hours, "hour"))
    } else if minutes < 2_520 {
        "1 day".to_string()
    } else if minutes < MINUTES_IN_MONTH {
        let days = (minutes as f64 / MINUTES_IN_DAY as f64).round() as i64;
        plural(days, "day")
    } else if minutes < MINUTES_IN_TWO_MONTHS {
        let months = (minutes as f64 / MINUTES_IN_MONTH as f64).round() as i64;
        format!("about {}", plural(months, "month"))
    } else {
        let months = minutes / MINUTES_IN_MONTH;
        if months < 12 {
            let nearest = (minutes as f64 / MINUTES_IN_MONTH as f64).round() as i64;
            plural(nearest, "month")
        } else {
            let years = months / 12;
            match months % 12 {
                0..=2 => format!("about {}", plural(years, "year")),
                3..=8 => format!("over {}", plural(years, "year")),
                _ => format!("almost {}", plural(years + 1, "year")),
            }
        }
    };

    if past {
        format!("{distance} ago")
    } else {
        format!("in {distance}")
    }
}

// -- Users ------------------------------------------------------------------

/// Case-insensitive match on username or display name. An empty query
/// keeps everyone.
pub fn filter_profiles<'a>(profiles: &'a [UserProfile], query: &str) -> Vec<&'a UserProfile> {
    let needle = query.to_lowercase();
    profiles
        .iter()
        .filter(|p| {
            p.username.to_lowercase().contains(&needle)
                || p.display_name.to_lowercase().contains(&needle)
        })
        .collect()
}

pub fn presence_label(profile: &UserProfile, now: DateTime<Utc>) -> String {
    if profile.is_online {
        "Online".to_string()
    } else {
        format!("Last seen {}", relative_time(time_to_datetime(profile.last_seen), now))
    }
}

// -- App phase --------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppPhase {
    Initializing,
    Login,
    /// Signed in, and the backend confirmed there is no profile yet.
    ProfileSetup,
    Ready,
}

impl AppPhase {
    /// `profile` is the caller-profile query result: `None` while it has
    /// not completed, `Some(None)` when the caller has no profile.
    pub fn evaluate(
        identity_initializing: bool,
        signed_in: bool,
        profile: Option<&Option<UserProfile>>,
    ) -> Self {
        if identity_initializing {
            Self::Initializing
        } else if !signed_in {
            Self::Login
        } else if matches!(profile, Some(None)) {
            Self::ProfileSetup
        } else {
            Self::Ready
        }
    }
}
