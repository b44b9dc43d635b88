//! Remote writes and their cache side effects.
//!
//! A mutation is one backend call. When it succeeds the affected query
//! keys are invalidated and an optional success notification is shown;
//! when it fails the cache is left untouched and the error is reported.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::Result;
use crate::events::Notifier;
use crate::query::{QueryClient, QueryKey};

/// Counts in-flight calls of one mutation so a UI can disable its trigger.
#[derive(Debug, Clone, Default)]
pub struct MutationTracker {
    pending: Arc<AtomicUsize>,
}

impl MutationTracker {
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    fn begin(&self) -> PendingGuard {
        self.pending.fetch_add(1, Ordering::SeqCst);
        PendingGuard {
            pending: self.pending.clone(),
        }
    }
}

struct PendingGuard {
    pending: Arc<AtomicUsize>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }
}

/// One tracker per client mutation.
#[derive(Debug, Clone, Default)]
pub struct Mutations {
    pub send_message: MutationTracker,
    pub update_message: MutationTracker,
    pub delete_message: MutationTracker,
    pub send_direct_message: MutationTracker,
    pub save_profile: MutationTracker,
    pub update_display_name: MutationTracker,
    pub update_bio: MutationTracker,
    pub upload_avatar: MutationTracker,
    pub toggle_online_status: MutationTracker,
    pub set_site_logo: MutationTracker,
    pub upload_image: MutationTracker,
    pub assign_role: MutationTracker,
}

/// What a mutation does around its backend call.
#[derive(Debug, Clone)]
pub struct MutationSpec {
    name: &'static str,
    invalidates: Vec<QueryKey>,
    success_message: Option<&'static str>,
    error_fallback: &'static str,
    notify_error: bool,
}

impl MutationSpec {
    pub fn new(name: &'static str, error_fallback: &'static str) -> Self {
        Self {
            name,
            invalidates: Vec::new(),
            success_message: None,
            error_fallback,
            notify_error: true,
        }
    }

    pub fn invalidates(mut self, key: QueryKey) -> Self {
        self.invalidates.push(key);
        self
    }

    pub fn on_success(mut self, message: &'static str) -> Self {
        self.success_message = Some(message);
        self
    }

    /// Log failures instead of notifying the user.
    pub fn quiet_errors(mut self) -> Self {
        self.notify_error = false;
        self
    }
}

/// Run `call` under `spec`.
pub(crate) async fn run_mutation<T, Fut>(
    queries: &QueryClient,
    notifier: &Notifier,
    tracker: &MutationTracker,
    spec: MutationSpec,
    call: Fut,
) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    let _pending = tracker.begin();
    match call.await {
        Ok(value) => {
            for key in &spec.invalidates {
                queries.invalidate(key);
            }
            info!(mutation = spec.name, "Mutation succeeded");
            if let Some(message) = spec.success_message {
                notifier.success(message);
            }
            Ok(value)
        }
        Err(e) => {
            let mut message = e.to_string();
            if message.trim().is_empty() {
                message = spec.error_fallback.to_string();
            }
            if spec.notify_error {
                notifier.error(message);
            } else {
                warn!(mutation = spec.name, error = %message, "Mutation failed");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::events::NotificationLevel;
    use ghostchat_shared::BackendError;

    #[tokio::test]
    async fn success_invalidates_and_notifies() {
        let queries = QueryClient::new();
        let notifier = Notifier::new();
        let mut toasts = notifier.subscribe();
        let tracker = MutationTracker::default();
        queries.set_data(QueryKey::CurrentUserProfile, 1u8);

        let spec = MutationSpec::new("updateBio", "Failed to update bio")
            .invalidates(QueryKey::CurrentUserProfile)
            .on_success("Bio updated");
        run_mutation(&queries, &notifier, &tracker, spec, async { Ok(()) })
            .await
            .unwrap();

        assert!(queries.state(&QueryKey::CurrentUserProfile).is_stale);
        let toast = toasts.recv().await.unwrap();
        assert_eq!(toast.level, NotificationLevel::Success);
        assert_eq!(toast.message, "Bio updated");
        assert!(!tracker.is_pending());
    }

    #[tokio::test]
    async fn failure_leaves_cache_alone_and_uses_fallback_text() {
        let queries = QueryClient::new();
        let notifier = Notifier::new();
        let mut toasts = notifier.subscribe();
        let tracker = MutationTracker::default();
        queries.set_data(QueryKey::GlobalMessages, 1u8);

        let spec = MutationSpec::new("deleteMessage", "Failed to delete message")
            .invalidates(QueryKey::GlobalMessages);
        let result: Result<()> = run_mutation(&queries, &notifier, &tracker, spec, async {
            Err(ClientError::Backend(BackendError::Rejected(String::new())))
        })
        .await;

        assert!(result.is_err());
        assert!(!queries.state(&QueryKey::GlobalMessages).is_stale);
        let toast = toasts.recv().await.unwrap();
        assert_eq!(toast.level, NotificationLevel::Error);
        assert_eq!(toast.message, "Failed to delete message");
    }

    #[tokio::test]
    async fn quiet_errors_are_not_shown() {
        let queries = QueryClient::new();
        let notifier = Notifier::new();
        let mut toasts = notifier.subscribe();
        let tracker = MutationTracker::default();

        let spec = MutationSpec::new("toggleOnlineStatus", "Failed").quiet_errors();
        let _ = run_mutation::<(), _>(&queries, &notifier, &tracker, spec, async {
            Err(BackendError::Unavailable.into())
        })
        .await;

        assert!(toasts.try_recv().is_err());
    }

    #[tokio::test]
    async fn tracker_is_pending_while_call_runs() {
        let queries = QueryClient::new();
        let notifier = Notifier::new();
        let tracker = MutationTracker::default();
        let observed = tracker.clone();

        let spec = MutationSpec::new("sendMessage", "Failed to send message");
        run_mutation(&queries, &notifier, &tracker, spec, async move {
            assert!(observed.is_pending());
            Ok(())
        })
        .await
        .unwrap();
        assert!(!tracker.is_pending());
    }
}
