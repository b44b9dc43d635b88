use tracing::{debug, info};

use ghostchat_shared::{BackendStatus, ExternalBlob, UserId, UserRole};

use crate::access::{AdminAccess, RoleCheck};
use crate::client::ChatClient;
use crate::error::Result;
use crate::mutation::{run_mutation, MutationSpec};
use crate::query::{QueryKey, QueryStatus};

impl ChatClient {
    async fn load_is_admin(&self) -> Result<bool> {
        Ok(self.actor()?.is_caller_admin().await?)
    }

    async fn load_role(&self) -> Result<UserRole> {
        Ok(self.actor()?.get_caller_user_role().await?)
    }

    pub async fn is_caller_admin(&self) -> Result<bool> {
        let load = self.loader(|c: ChatClient| async move { c.load_is_admin().await });
        let is_admin = self.queries.ensure(QueryKey::IsCallerAdmin, load).await?;
        Ok(*is_admin)
    }

    pub async fn caller_role(&self) -> Result<UserRole> {
        let load = self.loader(|c: ChatClient| async move { c.load_role().await });
        let role = self.queries.ensure(QueryKey::CallerRole, load).await?;
        Ok(*role)
    }

    /// The admin check as it stands in the cache, without fetching.
    /// A failed check with nothing cached counts as "not admin".
    pub fn role_check(&self) -> RoleCheck {
        if let Some(is_admin) = self.queries.cached::<bool>(&QueryKey::IsCallerAdmin) {
            return RoleCheck::Resolved(*is_admin);
        }
        match self.queries.state(&QueryKey::IsCallerAdmin).status {
            QueryStatus::Error => RoleCheck::Resolved(false),
            _ => RoleCheck::Pending,
        }
    }

    /// Backend admin AND unlocked for this session.
    pub fn admin_access(&self) -> AdminAccess {
        AdminAccess::evaluate(self.role_check(), self.unlock.state())
    }

    /// Run the role check if needed, then evaluate access.
    pub async fn resolve_admin_access(&self) -> AdminAccess {
        // A failed check is folded into the role check as "not admin".
        if let Err(e) = self.is_caller_admin().await {
            debug!(error = %e, "Admin role check failed");
        }
        self.admin_access()
    }

    pub async fn assign_role(&self, user: &UserId, role: UserRole) -> Result<()> {
        let spec = MutationSpec::new("assignCallerUserRole", "Failed to assign role")
            .invalidates(QueryKey::IsCallerAdmin)
            .invalidates(QueryKey::CallerRole)
            .on_success("Role assigned");
        run_mutation(
            &self.queries,
            &self.notifier,
            &self.mutations.assign_role,
            spec,
            async {
                self.actor()?.assign_caller_user_role(user, role).await?;
                info!(user = %user, role = role.as_str(), "Role assigned");
                Ok(())
            },
        )
        .await
    }

    /// Store an image for use elsewhere and return its URL.
    pub async fn upload_image(&self, image: ExternalBlob) -> Result<String> {
        let spec = MutationSpec::new("uploadImage", "Failed to upload image")
            .on_success("Image uploaded successfully");
        let stored = run_mutation(
            &self.queries,
            &self.notifier,
            &self.mutations.upload_image,
            spec,
            async { Ok(self.actor()?.upload_blob(image).await?) },
        )
        .await?;
        Ok(stored.direct_url().unwrap_or_default().to_string())
    }

    pub async fn backend_status(&self) -> Result<BackendStatus> {
        Ok(self.actor()?.get_status().await?)
    }
}
