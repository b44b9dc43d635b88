use std::sync::Arc;

use tracing::{debug, info};

use ghostchat_shared::validation::require_field;
use ghostchat_shared::{now_time, BackendError, ExternalBlob, UserId, UserProfile};

use crate::client::ChatClient;
use crate::error::{ClientError, Result};
use crate::mutation::{run_mutation, MutationSpec};
use crate::poll::{observe, QueryWatch};
use crate::query::QueryKey;

/// Which profile fields an edit actually sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileEdits {
    pub display_name: bool,
    pub bio: bool,
}

impl ProfileEdits {
    pub fn is_empty(&self) -> bool {
        !self.display_name && !self.bio
    }
}

impl ChatClient {
    async fn load_caller_profile(&self) -> Result<Option<UserProfile>> {
        Ok(self.actor()?.get_caller_user_profile().await?)
    }

    async fn load_all_profiles(&self) -> Result<Vec<UserProfile>> {
        Ok(self.actor()?.get_all_profiles().await?)
    }

    async fn load_user_profile(&self, user: &UserId) -> Result<Option<UserProfile>> {
        Ok(self.actor()?.get_user_profile(user).await?)
    }

    /// The caller's profile, `None` until one has been created.
    pub async fn caller_profile(&self) -> Result<Arc<Option<UserProfile>>> {
        let load = self.loader(|c: ChatClient| async move { c.load_caller_profile().await });
        self.queries.ensure(QueryKey::CurrentUserProfile, load).await
    }

    pub fn watch_caller_profile(&self) -> QueryWatch<Option<UserProfile>> {
        let load = self.loader(|c: ChatClient| async move { c.load_caller_profile().await });
        observe(self.queries.clone(), QueryKey::CurrentUserProfile, None, load)
    }

    pub async fn all_profiles(&self) -> Result<Arc<Vec<UserProfile>>> {
        let load = self.loader(|c: ChatClient| async move { c.load_all_profiles().await });
        self.queries.ensure(QueryKey::AllProfiles, load).await
    }

    pub fn watch_all_profiles(&self) -> QueryWatch<Vec<UserProfile>> {
        let load = self.loader(|c: ChatClient| async move { c.load_all_profiles().await });
        observe(self.queries.clone(), QueryKey::AllProfiles, None, load)
    }

    /// Another user's profile; `None` when they have not created one.
    pub async fn user_profile(&self, user: &UserId) -> Result<Arc<Option<UserProfile>>> {
        let target = user.clone();
        let load = self.loader(move |c: ChatClient| {
            let target = target.clone();
            async move { c.load_user_profile(&target).await }
        });
        self.queries
            .ensure(QueryKey::UserProfile(user.clone()), load)
            .await
    }

    pub async fn save_caller_profile(&self, profile: UserProfile) -> Result<()> {
        let spec = MutationSpec::new("saveCallerUserProfile", "Failed to save profile")
            .invalidates(QueryKey::CurrentUserProfile)
            .on_success("Profile saved successfully");
        run_mutation(
            &self.queries,
            &self.notifier,
            &self.mutations.save_profile,
            spec,
            async {
                let username = profile.username.clone();
                self.actor()?.save_caller_user_profile(profile).await?;
                info!(username = %username, "Profile saved");
                Ok(())
            },
        )
        .await
    }

    /// First-run profile setup. Username and display name are required.
    pub async fn create_profile(&self, username: &str, display_name: &str, bio: &str) -> Result<()> {
        let username = require_field("Username", username)?;
        let display_name = require_field("Display name", display_name)?;
        let user_id = self
            .identity
            .clone()
            .ok_or(ClientError::Backend(BackendError::Unavailable))?;

        let now = now_time();
        let profile = UserProfile {
            user_id,
            username: username.to_string(),
            display_name: display_name.to_string(),
            bio: bio.trim().to_string(),
            avatar: None,
            is_online: true,
            last_seen: now,
            created_at: now,
        };
        self.save_caller_profile(profile).await
    }

    /// Send only the fields that differ from the cached profile, display
    /// name first. Stops at the first failure.
    pub async fn save_profile_edits(&self, display_name: &str, bio: &str) -> Result<ProfileEdits> {
        let current = self.caller_profile().await?;
        let display_name = display_name.trim();
        let bio = bio.trim();
        let mut sent = ProfileEdits::default();

        let (old_name, old_bio) = match current.as_ref() {
            Some(p) => (Some(p.display_name.as_str()), Some(p.bio.as_str())),
            None => (None, None),
        };

        if old_name != Some(display_name) {
            self.update_display_name(display_name).await?;
            sent.display_name = true;
        }
        if old_bio != Some(bio) {
            self.update_bio(bio).await?;
            sent.bio = true;
        }
        if sent.is_empty() {
            debug!("Profile unchanged, nothing sent");
        }
        Ok(sent)
    }

    pub async fn update_display_name(&self, display_name: &str) -> Result<()> {
        let spec = MutationSpec::new("updateDisplayName", "Failed to update display name")
            .invalidates(QueryKey::CurrentUserProfile)
            .on_success("Display name updated");
        run_mutation(
            &self.queries,
            &self.notifier,
            &self.mutations.update_display_name,
            spec,
            async { Ok(self.actor()?.update_display_name(display_name).await?) },
        )
        .await
    }

    pub async fn update_bio(&self, bio: &str) -> Result<()> {
        let spec = MutationSpec::new("updateBio", "Failed to update bio")
            .invalidates(QueryKey::CurrentUserProfile)
            .on_success("Bio updated");
        run_mutation(
            &self.queries,
            &self.notifier,
            &self.mutations.update_bio,
            spec,
            async { Ok(self.actor()?.update_bio(bio).await?) },
        )
        .await
    }

    pub async fn upload_avatar(&self, avatar: ExternalBlob) -> Result<()> {
        let spec = MutationSpec::new("uploadAvatar", "Failed to upload avatar")
            .invalidates(QueryKey::CurrentUserProfile)
            .invalidates(QueryKey::AllProfiles)
            .on_success("Avatar uploaded successfully");
        run_mutation(
            &self.queries,
            &self.notifier,
            &self.mutations.upload_avatar,
            spec,
            async { Ok(self.actor()?.upload_avatar(avatar).await?) },
        )
        .await
    }

    /// Failures are logged, never shown.
    pub async fn toggle_online_status(&self, is_online: bool) -> Result<()> {
        let spec = MutationSpec::new("toggleOnlineStatus", "Failed to toggle online status")
            .invalidates(QueryKey::CurrentUserProfile)
            .quiet_errors();
        run_mutation(
            &self.queries,
            &self.notifier,
            &self.mutations.toggle_online_status,
            spec,
            async { Ok(self.actor()?.toggle_online_status(is_online).await?) },
        )
        .await
    }
}
