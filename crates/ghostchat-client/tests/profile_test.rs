mod common;

use ghostchat_client::views::AppPhase;
use ghostchat_client::{ClientError, MemoryBackend, QueryKey};
use ghostchat_shared::{BackendError, ValidationError};

#[tokio::test]
async fn new_identity_goes_through_profile_setup() {
    let backend = MemoryBackend::new("seed");
    let alice = common::client_for(&backend, "alice");

    assert!(alice.caller_profile().await.unwrap().is_none());
    assert_eq!(alice.phase(), AppPhase::ProfileSetup);

    alice.create_profile("  alice ", " Alice ", "").await.unwrap();
    let profile = alice.caller_profile().await.unwrap();
    let profile = profile.as_ref().as_ref().unwrap();
    assert_eq!(profile.username, "alice");
    assert_eq!(profile.display_name, "Alice");
    assert_eq!(alice.phase(), AppPhase::Ready);
}

#[tokio::test]
async fn setup_requires_username_and_display_name() {
    let backend = MemoryBackend::new("seed");
    let alice = common::client_for(&backend, "alice");
    let before = backend.call_count();

    let err = alice.create_profile(" ", "Alice", "").await.unwrap_err();
    assert_eq!(err, ClientError::Validation(ValidationError::MissingField("Username")));
    let err = alice.create_profile("alice", "", "").await.unwrap_err();
    assert_eq!(
        err,
        ClientError::Validation(ValidationError::MissingField("Display name"))
    );
    assert_eq!(backend.call_count(), before);
}

#[tokio::test]
async fn taken_username_is_reported() {
    let backend = MemoryBackend::new("seed");
    common::signed_up(&backend, "alice").await;
    let impostor = common::client_for(&backend, "mallory");
    let mut toasts = impostor.notifications();

    let err = impostor.create_profile("alice", "Not Alice", "").await.unwrap_err();
    assert_eq!(
        err,
        ClientError::Backend(BackendError::Rejected("Username already taken".into()))
    );
    let seen = common::drain(&mut toasts);
    assert_eq!(seen[0].message, "Username already taken");
}

#[tokio::test]
async fn saved_edits_are_visible_after_invalidation() {
    let backend = MemoryBackend::new("seed");
    let alice = common::signed_up(&backend, "alice").await;
    alice.caller_profile().await.unwrap();

    let sent = alice.save_profile_edits(" Alice L. ", "").await.unwrap();
    assert!(sent.display_name);
    assert!(!sent.bio);
    assert!(alice.queries().state(&QueryKey::CurrentUserProfile).is_stale);

    let profile = alice.caller_profile().await.unwrap();
    assert_eq!(profile.as_ref().as_ref().unwrap().display_name, "Alice L.");

    let before = backend.call_count();
    let sent = alice.save_profile_edits("Alice L.", "").await.unwrap();
    assert!(sent.is_empty());
    assert_eq!(backend.call_count(), before);
}

#[tokio::test]
async fn online_toggle_failures_stay_quiet() {
    let backend = MemoryBackend::new("seed");
    let alice = common::signed_up(&backend, "alice").await;
    let mut toasts = alice.notifications();

    backend.fail_next_calls(1);
    assert!(alice.toggle_online_status(false).await.is_err());
    assert!(common::drain(&mut toasts).is_empty());

    alice.toggle_online_status(false).await.unwrap();
    let profile = alice.caller_profile().await.unwrap();
    assert!(!profile.as_ref().as_ref().unwrap().is_online);
}

#[tokio::test]
async fn user_search_and_other_profiles() {
    let backend = MemoryBackend::new("seed");
    let alice = common::signed_up(&backend, "alice").await;
    common::signed_up(&backend, "bob").await;

    let everyone = alice.all_profiles().await.unwrap();
    assert_eq!(everyone.len(), 2);
    let found = ghostchat_client::views::filter_profiles(&everyone, "BO");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].username, "bob");

    let bob = alice.user_profile(&found[0].user_id).await.unwrap();
    assert_eq!(bob.as_ref().as_ref().unwrap().display_name, "Bob");
    let nobody = alice
        .user_profile(&ghostchat_shared::UserId::from("ghost"))
        .await
        .unwrap();
    assert!(nobody.is_none());
}

#[tokio::test]
async fn logout_clears_cached_state() {
    let backend = MemoryBackend::new("seed");
    let alice = common::signed_up(&backend, "alice").await;
    alice.caller_profile().await.unwrap();
    alice.fetch_global_messages().await.unwrap();

    alice.logout().await;

    assert!(alice.global_messages().is_none());
    assert!(alice
        .queries()
        .cached::<Option<ghostchat_shared::UserProfile>>(&QueryKey::CurrentUserProfile)
        .is_none());
    let observer = common::client_for(&backend, "observer");
    let profiles = observer.all_profiles().await.unwrap();
    assert!(!profiles[0].is_online);
}
