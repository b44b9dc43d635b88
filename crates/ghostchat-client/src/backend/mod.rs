//! The remote backend boundary.
//!
//! [`Backend`] is the typed stub for every operation the message, profile,
//! blob and role stores expose. The transport behind it is opaque to the
//! rest of the client; [`memory::MemoryBackend`] is an in-process
//! implementation used for tests and offline development.

pub mod memory;

use async_trait::async_trait;

use ghostchat_shared::{
    BackendError, BackendStatus, DirectMessage, DirectMessageStats, DirectMessageSummary,
    ExternalBlob, Message, MessageId, Time, UserId, UserProfile, UserRole,
};

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Operations consumed from the remote backend, called on behalf of one
/// authenticated caller.
#[async_trait]
pub trait Backend: Send + Sync {
    // -- Global room --------------------------------------------------------

    /// Messages created at or after `from`, oldest first.
    async fn fetch_global_messages(&self, from: Time) -> BackendResult<Vec<Message>>;

    async fn send_message(
        &self,
        room: &str,
        content: &str,
        attachment: Option<ExternalBlob>,
    ) -> BackendResult<()>;

    async fn send_message_with_attachments(
        &self,
        room: &str,
        content: &str,
        attachments: Vec<ExternalBlob>,
    ) -> BackendResult<()>;

    /// `Ok(false)` when the message does not exist.
    async fn update_message(
        &self,
        room: &str,
        id: MessageId,
        new_content: Option<String>,
        new_attachment: Option<ExternalBlob>,
    ) -> BackendResult<bool>;

    async fn delete_global_message(&self, id: MessageId) -> BackendResult<()>;

    // -- Profiles -----------------------------------------------------------

    async fn get_caller_user_profile(&self) -> BackendResult<Option<UserProfile>>;

    async fn save_caller_user_profile(&self, profile: UserProfile) -> BackendResult<()>;

    /// Errors with `NotFound` when the user has no profile.
    async fn get_profile(&self, user: &UserId) -> BackendResult<UserProfile>;

    async fn get_user_profile(&self, user: &UserId) -> BackendResult<Option<UserProfile>>;

    async fn get_all_profiles(&self) -> BackendResult<Vec<UserProfile>>;

    async fn update_display_name(&self, display_name: &str) -> BackendResult<()>;

    async fn update_bio(&self, bio: &str) -> BackendResult<()>;

    async fn upload_avatar(&self, avatar: ExternalBlob) -> BackendResult<()>;

    async fn toggle_online_status(&self, is_online: bool) -> BackendResult<()>;

    // -- Direct messages ----------------------------------------------------

    async fn send_direct_message(
        &self,
        receiver: &UserId,
        content: &str,
        attachment: Option<ExternalBlob>,
    ) -> BackendResult<()>;

    /// `None` when the two users never exchanged a message.
    async fn get_direct_message_thread(
        &self,
        participant: &UserId,
    ) -> BackendResult<Option<Vec<DirectMessage>>>;

    async fn get_all_direct_messages_with_user(
        &self,
        user: &UserId,
    ) -> BackendResult<Vec<DirectMessage>>;

    async fn get_direct_messages_with_stats(
        &self,
        participant: &UserId,
    ) -> BackendResult<DirectMessageStats>;

    async fn get_all_direct_messages_stats(&self, user: &UserId) -> BackendResult<DirectMessageStats>;

    async fn get_direct_message_threads_stats(&self) -> BackendResult<Vec<DirectMessageSummary>>;

    // -- Blobs and site settings --------------------------------------------

    /// Store local bytes and return the uploaded reference.
    async fn upload_blob(&self, blob: ExternalBlob) -> BackendResult<ExternalBlob>;

    async fn get_site_logo(&self) -> BackendResult<Option<ExternalBlob>>;

    /// Returns the stored reference so callers learn the logo's URL.
    async fn set_site_logo(&self, logo: ExternalBlob) -> BackendResult<ExternalBlob>;

    // -- Access control -----------------------------------------------------

    async fn get_caller_user_role(&self) -> BackendResult<UserRole>;

    async fn is_caller_admin(&self) -> BackendResult<bool>;

    async fn assign_caller_user_role(&self, user: &UserId, role: UserRole) -> BackendResult<()>;

    // -- Session ------------------------------------------------------------

    async fn get_status(&self) -> BackendResult<BackendStatus>;

    async fn logout(&self) -> BackendResult<()>;
}
