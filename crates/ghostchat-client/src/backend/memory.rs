//! In-process backend.
//!
//! Implements the whole [`Backend`] surface over shared in-memory state.
//! Every [`MemoryBackend`] handle acts for one caller; [`MemoryBackend::connect`]
//! opens another handle on the same state, which is how tests model a
//! second user or a second tab.
//!
//! Rules mirror what the real backend enforces: one profile per identity,
//! unique and immutable usernames, sender-only edits, admin-only logo and
//! role changes. The first identity to save a profile becomes admin.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use ghostchat_shared::constants::GLOBAL_ROOM_ID;
use ghostchat_shared::{
    now_time, BackendError, BackendStatus, DirectMessage, DirectMessageStats,
    DirectMessageSummary, ExternalBlob, Message, MessageId, Time, UserId, UserProfile, UserRole,
};

use super::{Backend, BackendResult};

/// Upload progress steps reported while "transferring" local bytes.
const UPLOAD_STEPS: [u8; 4] = [25, 50, 75, 100];

struct StoredDirect {
    message: DirectMessage,
    read: bool,
}

struct Thread {
    id: u64,
    created_at: Time,
}

#[derive(Default)]
struct MemoryState {
    profiles: BTreeMap<UserId, UserProfile>,
    roles: HashMap<UserId, UserRole>,
    rooms: HashMap<String, Vec<Message>>,
    direct: Vec<StoredDirect>,
    threads: BTreeMap<(UserId, UserId), Thread>,
    blobs: HashMap<String, Bytes>,
    site_logo: Option<ExternalBlob>,
    next_message_id: MessageId,
    next_thread_id: u64,
    last_time: Time,
    startup_time: Time,
    fail_next: u32,
    fail_next_transfers: u32,
    calls: u64,
}

impl MemoryState {
    /// Strictly increasing clock so ordering by time matches ordering by id.
    fn tick(&mut self) -> Time {
        let now = now_time().max(self.last_time + 1);
        self.last_time = now;
        now
    }

    fn next_id(&mut self) -> MessageId {
        self.next_message_id += 1;
        self.next_message_id
    }

    fn role_of(&self, user: &UserId) -> UserRole {
        match self.roles.get(user) {
            Some(role) => *role,
            None if self.profiles.contains_key(user) => UserRole::User,
            None => UserRole::Guest,
        }
    }

    fn require_profile(&self, user: &UserId) -> BackendResult<&UserProfile> {
        self.profiles
            .get(user)
            .ok_or_else(|| BackendError::NotFound(format!("profile for {user}")))
    }

    fn require_profile_mut(&mut self, user: &UserId) -> BackendResult<&mut UserProfile> {
        self.profiles
            .get_mut(user)
            .ok_or_else(|| BackendError::NotFound(format!("profile for {user}")))
    }

    fn require_admin(&self, user: &UserId, action: &str) -> BackendResult<()> {
        if self.role_of(user) == UserRole::Admin {
            Ok(())
        } else {
            Err(BackendError::Unauthorized(format!("only admins can {action}")))
        }
    }

    fn ensure_thread(&mut self, a: &UserId, b: &UserId, now: Time) {
        let key = thread_key(a, b);
        if !self.threads.contains_key(&key) {
            self.next_thread_id += 1;
            let id = self.next_thread_id;
            self.threads.insert(key, Thread { id, created_at: now });
        }
    }

    fn conversation(&self, a: &UserId, b: &UserId) -> Vec<DirectMessage> {
        self.direct
            .iter()
            .filter(|d| is_between(&d.message, a, b))
            .map(|d| d.message.clone())
            .collect()
    }

    fn stats(&self, me: &UserId, filter: impl Fn(&DirectMessage) -> bool) -> DirectMessageStats {
        let mut messages = Vec::new();
        let mut unread_count = 0;
        for stored in self.direct.iter().filter(|d| filter(&d.message)) {
            if stored.message.receiver_id == *me && !stored.read {
                unread_count += 1;
            }
            messages.push(stored.message.clone());
        }
        DirectMessageStats {
            total_count: messages.len() as u64,
            unread_count,
            last_message_time: messages.iter().map(|m| m.created_at).max(),
            messages,
        }
    }

    fn username_of(&self, user: &UserId) -> String {
        self.profiles
            .get(user)
            .map(|p| p.username.clone())
            .unwrap_or_else(|| user.to_string())
    }
}

fn thread_key(a: &UserId, b: &UserId) -> (UserId, UserId) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

fn is_between(m: &DirectMessage, a: &UserId, b: &UserId) -> bool {
    (m.sender_id == *a && m.receiver_id == *b) || (m.sender_id == *b && m.receiver_id == *a)
}

fn ensure_content(content: &str, has_attachment: bool) -> BackendResult<()> {
    if content.trim().is_empty() && !has_attachment {
        return Err(BackendError::Rejected("Message cannot be empty".into()));
    }
    Ok(())
}

/// Handle onto shared in-memory backend state, acting as one caller.
#[derive(Clone)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
    caller: UserId,
}

impl MemoryBackend {
    pub fn new(caller: impl Into<UserId>) -> Self {
        let state = MemoryState {
            startup_time: now_time(),
            ..MemoryState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            caller: caller.into(),
        }
    }

    /// Another handle on the same state, acting as `caller`.
    pub fn connect(&self, caller: impl Into<UserId>) -> Self {
        Self {
            state: self.state.clone(),
            caller: caller.into(),
        }
    }

    pub fn caller(&self) -> &UserId {
        &self.caller
    }

    /// Make the next `n` calls (from any handle) fail with `Rejected`.
    pub fn fail_next_calls(&self, n: u32) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_next = n;
        }
    }

    /// Fail the next `n` blob uploads after all their bytes were sent.
    pub fn fail_next_transfers(&self, n: u32) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_next_transfers = n;
        }
    }

    /// Number of backend calls made so far, across all handles.
    pub fn call_count(&self) -> u64 {
        self.state.lock().map(|s| s.calls).unwrap_or_default()
    }

    /// Set a role directly, bypassing the admin check.
    pub fn grant_role(&self, user: &UserId, role: UserRole) {
        if let Ok(mut state) = self.state.lock() {
            state.roles.insert(user.clone(), role);
        }
    }

    /// Bytes stored under an uploaded blob URL.
    pub fn blob_bytes(&self, url: &str) -> Option<Bytes> {
        self.state.lock().ok()?.blobs.get(url).cloned()
    }

    fn state(&self) -> BackendResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| BackendError::Rejected("backend state poisoned".into()))
    }

    fn begin(&self, op: &'static str) -> BackendResult<()> {
        let mut state = self.state()?;
        state.calls += 1;
        if state.fail_next > 0 {
            state.fail_next -= 1;
            debug!(op, caller = %self.caller, "injected backend failure");
            return Err(BackendError::Rejected(format!("{op} failed")));
        }
        Ok(())
    }

    async fn store_blob(&self, blob: ExternalBlob) -> BackendResult<ExternalBlob> {
        let Some(data) = blob.bytes().cloned() else {
            return Ok(blob);
        };
        for pct in UPLOAD_STEPS {
            blob.report_progress(pct);
            tokio::task::yield_now().await;
        }
        {
            let mut state = self.state()?;
            if state.fail_next_transfers > 0 {
                state.fail_next_transfers -= 1;
                debug!(caller = %self.caller, "injected transfer failure");
                return Err(BackendError::Rejected("Upload interrupted".into()));
            }
        }
        let url = format!("memory://blobs/{}", blake3::hash(&data).to_hex());
        debug!(url = %url, size = data.len(), "stored blob");
        self.state()?.blobs.insert(url.clone(), data);
        Ok(ExternalBlob::from_url(url))
    }

    async fn store_optional(
        &self,
        blob: Option<ExternalBlob>,
    ) -> BackendResult<Option<ExternalBlob>> {
        match blob {
            Some(b) => Ok(Some(self.store_blob(b).await?)),
            None => Ok(None),
        }
    }

    async fn append_to_room(
        &self,
        room: &str,
        content: &str,
        attachment: Option<ExternalBlob>,
    ) -> BackendResult<()> {
        ensure_content(content, attachment.is_some())?;
        self.state()?.require_profile(&self.caller).map_err(|_| {
            BackendError::Unauthorized("create a profile before sending messages".into())
        })?;

        let attachment = self.store_optional(attachment).await?;

        let mut state = self.state()?;
        let sender_username = state.require_profile(&self.caller)?.username.clone();
        let created_at = state.tick();
        let id = state.next_id();
        state.rooms.entry(room.to_string()).or_default().push(Message {
            id,
            sender_id: self.caller.clone(),
            sender_username,
            content: content.to_string(),
            attachment,
            edited: false,
            created_at,
        });
        Ok(())
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn fetch_global_messages(&self, from: Time) -> BackendResult<Vec<Message>> {
        self.begin("fetchGlobalMessages")?;
        let state = self.state()?;
        Ok(state
            .rooms
            .get(GLOBAL_ROOM_ID)
            .map(|msgs| {
                msgs.iter()
                    .filter(|m| m.created_at >= from)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn send_message(
        &self,
        room: &str,
        content: &str,
        attachment: Option<ExternalBlob>,
    ) -> BackendResult<()> {
        self.begin("sendMessage")?;
        self.append_to_room(room, content, attachment).await
    }

    async fn send_message_with_attachments(
        &self,
        room: &str,
        content: &str,
        attachments: Vec<ExternalBlob>,
    ) -> BackendResult<()> {
        self.begin("sendMessageWithAttachments")?;
        // One attachment per message is all the message record holds.
        let first = attachments.into_iter().next();
        self.append_to_room(room, content, first).await
    }

    async fn update_message(
        &self,
        room: &str,
        id: MessageId,
        new_content: Option<String>,
        new_attachment: Option<ExternalBlob>,
    ) -> BackendResult<bool> {
        self.begin("updateMessage")?;
        {
            let state = self.state()?;
            let Some(existing) = state
                .rooms
                .get(room)
                .and_then(|msgs| msgs.iter().find(|m| m.id == id))
            else {
                return Ok(false);
            };
            if existing.sender_id != self.caller {
                return Err(BackendError::Unauthorized(
                    "only the sender can edit a message".into(),
                ));
            }
        }

        let new_attachment = self.store_optional(new_attachment).await?;

        let mut state = self.state()?;
        let Some(message) = state
            .rooms
            .get_mut(room)
            .and_then(|msgs| msgs.iter_mut().find(|m| m.id == id))
        else {
            return Ok(false);
        };
        if let Some(content) = new_content {
            message.content = content;
        }
        if let Some(attachment) = new_attachment {
            message.attachment = Some(attachment);
        }
        message.edited = true;
        Ok(true)
    }

    async fn delete_global_message(&self, id: MessageId) -> BackendResult<()> {
        self.begin("deleteGlobalMessage")?;
        let mut state = self.state()?;
        let is_admin = state.role_of(&self.caller) == UserRole::Admin;
        let msgs = state.rooms.entry(GLOBAL_ROOM_ID.to_string()).or_default();
        let idx = msgs
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("message {id}")))?;
        if msgs[idx].sender_id != self.caller && !is_admin {
            return Err(BackendError::Unauthorized(
                "only the sender can delete a message".into(),
            ));
        }
        msgs.remove(idx);
        Ok(())
    }

    async fn get_caller_user_profile(&self) -> BackendResult<Option<UserProfile>> {
        self.begin("getCallerUserProfile")?;
        Ok(self.state()?.profiles.get(&self.caller).cloned())
    }

    async fn save_caller_user_profile(&self, profile: UserProfile) -> BackendResult<()> {
        self.begin("saveCallerUserProfile")?;
        let avatar = self.store_optional(profile.avatar.clone()).await?;

        let mut state = self.state()?;
        let taken = state.profiles.values().any(|p| {
            p.user_id != self.caller && p.username.eq_ignore_ascii_case(&profile.username)
        });
        if taken {
            return Err(BackendError::Rejected("Username already taken".into()));
        }

        let existing = state.profiles.get(&self.caller).cloned();
        if let Some(existing) = &existing {
            if existing.username != profile.username {
                return Err(BackendError::Rejected("Username cannot be changed".into()));
            }
        }

        let first_admin = !state.roles.values().any(|r| *r == UserRole::Admin);
        let stored = UserProfile {
            user_id: self.caller.clone(),
            created_at: existing.as_ref().map_or(profile.created_at, |e| e.created_at),
            avatar,
            ..profile
        };
        state.profiles.insert(self.caller.clone(), stored);
        if existing.is_none() && first_admin {
            state.roles.insert(self.caller.clone(), UserRole::Admin);
        }
        Ok(())
    }

    async fn get_profile(&self, user: &UserId) -> BackendResult<UserProfile> {
        self.begin("getProfile")?;
        self.state()?.require_profile(user).cloned()
    }

    async fn get_user_profile(&self, user: &UserId) -> BackendResult<Option<UserProfile>> {
        self.begin("getUserProfile")?;
        Ok(self.state()?.profiles.get(user).cloned())
    }

    async fn get_all_profiles(&self) -> BackendResult<Vec<UserProfile>> {
        self.begin("getAllProfiles")?;
        Ok(self.state()?.profiles.values().cloned().collect())
    }

    async fn update_display_name(&self, display_name: &str) -> BackendResult<()> {
        self.begin("updateDisplayName")?;
        if display_name.trim().is_empty() {
            return Err(BackendError::Rejected("Display name cannot be empty".into()));
        }
        let mut state = self.state()?;
        state.require_profile_mut(&self.caller)?.display_name = display_name.to_string();
        Ok(())
    }

    async fn update_bio(&self, bio: &str) -> BackendResult<()> {
        self.begin("updateBio")?;
        let mut state = self.state()?;
        state.require_profile_mut(&self.caller)?.bio = bio.to_string();
        Ok(())
    }

    async fn upload_avatar(&self, avatar: ExternalBlob) -> BackendResult<()> {
        self.begin("uploadAvatar")?;
        self.state()?.require_profile(&self.caller)?;
        let stored = self.store_blob(avatar).await?;
        let mut state = self.state()?;
        state.require_profile_mut(&self.caller)?.avatar = Some(stored);
        Ok(())
    }

    async fn toggle_online_status(&self, is_online: bool) -> BackendResult<()> {
        self.begin("toggleOnlineStatus")?;
        let mut state = self.state()?;
        let now = state.tick();
        let profile = state.require_profile_mut(&self.caller)?;
        profile.is_online = is_online;
        profile.last_seen = now;
        Ok(())
    }

    async fn send_direct_message(
        &self,
        receiver: &UserId,
        content: &str,
        attachment: Option<ExternalBlob>,
    ) -> BackendResult<()> {
        self.begin("sendDirectMessage")?;
        ensure_content(content, attachment.is_some())?;
        if *receiver == self.caller {
            return Err(BackendError::Rejected("Cannot message yourself".into()));
        }
        {
            let state = self.state()?;
            state.require_profile(&self.caller)?;
            state.require_profile(receiver)?;
        }

        let attachment = self.store_optional(attachment).await?;

        let mut state = self.state()?;
        let sender_username = state.username_of(&self.caller);
        let created_at = state.tick();
        let id = state.next_id();
        state.ensure_thread(&self.caller, receiver, created_at);
        state.direct.push(StoredDirect {
            message: DirectMessage {
                id,
                sender_id: self.caller.clone(),
                receiver_id: receiver.clone(),
                sender_username,
                content: content.to_string(),
                attachment,
                edited: false,
                created_at,
            },
            read: false,
        });
        Ok(())
    }

    async fn get_direct_message_thread(
        &self,
        participant: &UserId,
    ) -> BackendResult<Option<Vec<DirectMessage>>> {
        self.begin("getDirectMessageThread")?;
        let mut state = self.state()?;
        let messages = state.conversation(&self.caller, participant);
        if messages.is_empty() {
            return Ok(None);
        }
        for stored in state.direct.iter_mut() {
            if stored.message.sender_id == *participant && stored.message.receiver_id == self.caller
            {
                stored.read = true;
            }
        }
        Ok(Some(messages))
    }

    async fn get_all_direct_messages_with_user(
        &self,
        user: &UserId,
    ) -> BackendResult<Vec<DirectMessage>> {
        self.begin("getAllDirectMessagesWithUser")?;
        Ok(self.state()?.conversation(&self.caller, user))
    }

    async fn get_direct_messages_with_stats(
        &self,
        participant: &UserId,
    ) -> BackendResult<DirectMessageStats> {
        self.begin("getDirectMessagesWithStats")?;
        let state = self.state()?;
        Ok(state.stats(&self.caller, |m| is_between(m, &self.caller, participant)))
    }

    async fn get_all_direct_messages_stats(&self, user: &UserId) -> BackendResult<DirectMessageStats> {
        self.begin("getAllDirectMessagesStats")?;
        let state = self.state()?;
        if *user != self.caller {
            state.require_admin(&self.caller, "read another user's messages")?;
        }
        Ok(state.stats(user, |m| m.sender_id == *user || m.receiver_id == *user))
    }

    async fn get_direct_message_threads_stats(&self) -> BackendResult<Vec<DirectMessageSummary>> {
        self.begin("getDirectMessageThreadsStats")?;
        let state = self.state()?;
        let mut summaries: Vec<DirectMessageSummary> = state
            .threads
            .iter()
            .filter(|((a, b), _)| *a == self.caller || *b == self.caller)
            .map(|((a, b), thread)| {
                let stats = state.stats(&self.caller, |m| is_between(m, a, b));
                let last_message = stats.messages.last().cloned();
                DirectMessageSummary {
                    thread_id: thread.id,
                    participant1: a.clone(),
                    participant2: b.clone(),
                    participant1_username: state.username_of(a),
                    participant2_username: state.username_of(b),
                    last_updated: stats.last_message_time.unwrap_or(thread.created_at),
                    last_message,
                    total_messages: stats.total_count,
                    unread_count: stats.unread_count,
                    created_at: thread.created_at,
                }
            })
            .collect();
        summaries.sort_by(|x, y| y.last_updated.cmp(&x.last_updated));
        Ok(summaries)
    }

    async fn upload_blob(&self, blob: ExternalBlob) -> BackendResult<ExternalBlob> {
        self.begin("uploadBlob")?;
        self.store_blob(blob).await
    }

    async fn get_site_logo(&self) -> BackendResult<Option<ExternalBlob>> {
        self.begin("getSiteLogo")?;
        Ok(self.state()?.site_logo.clone())
    }

    async fn set_site_logo(&self, logo: ExternalBlob) -> BackendResult<ExternalBlob> {
        self.begin("setSiteLogo")?;
        self.state()?
            .require_admin(&self.caller, "change the site logo")?;
        let stored = self.store_blob(logo).await?;
        self.state()?.site_logo = Some(stored.clone());
        Ok(stored)
    }

    async fn get_caller_user_role(&self) -> BackendResult<UserRole> {
        self.begin("getCallerUserRole")?;
        Ok(self.state()?.role_of(&self.caller))
    }

    async fn is_caller_admin(&self) -> BackendResult<bool> {
        self.begin("isCallerAdmin")?;
        Ok(self.state()?.role_of(&self.caller) == UserRole::Admin)
    }

    async fn assign_caller_user_role(&self, user: &UserId, role: UserRole) -> BackendResult<()> {
        self.begin("assignCallerUserRole")?;
        let mut state = self.state()?;
        state.require_admin(&self.caller, "assign roles")?;
        state.roles.insert(user.clone(), role);
        Ok(())
    }

    async fn get_status(&self) -> BackendResult<BackendStatus> {
        self.begin("getStatus")?;
        let state = self.state()?;
        let room_messages: usize = state.rooms.values().map(Vec::len).sum();
        Ok(BackendStatus {
            backend_time: now_time(),
            startup_time: state.startup_time,
            message_count: (room_messages + state.direct.len()) as u64,
            user_count: state.profiles.len() as u64,
        })
    }

    async fn logout(&self) -> BackendResult<()> {
        self.begin("logout")?;
        let mut state = self.state()?;
        let now = state.tick();
        if let Some(profile) = state.profiles.get_mut(&self.caller) {
            profile.is_online = false;
            profile.last_seen = now;
        }
        Ok(())
    }
}
