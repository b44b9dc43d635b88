use tracing::{info, warn};

use ghostchat_shared::UserProfile;

use crate::client::ChatClient;
use crate::query::QueryKey;
use crate::views::AppPhase;

impl ChatClient {
    /// Sign out: tell the backend, then forget every cached query.
    /// A failed backend call is logged and does not stop the local logout.
    pub async fn logout(&self) {
        match self.actor() {
            Ok(backend) => {
                if let Err(e) = backend.logout().await {
                    warn!(error = %e, "Backend logout failed");
                }
            }
            Err(e) => warn!(error = %e, "Logout without a backend"),
        }
        self.queries.clear();
        info!("Logged out");
    }

    /// Which top-level screen to show.
    pub fn phase(&self) -> AppPhase {
        let profile = self
            .queries
            .cached::<Option<UserProfile>>(&QueryKey::CurrentUserProfile);
        AppPhase::evaluate(false, self.is_signed_in(), profile.as_deref())
    }
}
