mod common;

use ghostchat_client::{ComposeTarget, Composer, QueryKey};
use ghostchat_client::MemoryBackend;
use ghostchat_shared::UserId;

#[tokio::test]
async fn unopened_conversation_is_empty() {
    let backend = MemoryBackend::new("seed");
    let alice = common::signed_up(&backend, "alice").await;
    common::signed_up(&backend, "bob").await;

    let messages = alice.fetch_direct_messages(&UserId::from("bob")).await.unwrap();
    assert!(messages.is_empty());
    assert!(alice.direct_message_threads().await.unwrap().is_empty());
}

#[tokio::test]
async fn unread_count_clears_once_the_thread_is_read() {
    let backend = MemoryBackend::new("seed");
    let alice = common::signed_up(&backend, "alice").await;
    let bob = common::signed_up(&backend, "bob").await;
    let alice_id = UserId::from("alice");
    let bob_id = UserId::from("bob");

    bob.send_direct_message(&alice_id, "psst", None).await.unwrap();
    bob.send_direct_message(&alice_id, "you there?", None).await.unwrap();

    let threads = alice.direct_message_threads().await.unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].peer_of(&alice_id), &bob_id);
    assert_eq!(threads[0].unread_count, 2);
    assert_eq!(threads[0].total_messages, 2);

    let messages = alice.fetch_direct_messages(&bob_id).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "you there?");

    let stats = alice.direct_message_stats(&bob_id).await.unwrap();
    assert_eq!(stats.unread_count, 0);
    assert_eq!(stats.total_count, 2);
}

#[tokio::test]
async fn sending_invalidates_conversation_and_threads() {
    let backend = MemoryBackend::new("seed");
    let alice = common::signed_up(&backend, "alice").await;
    common::signed_up(&backend, "bob").await;
    let bob_id = UserId::from("bob");

    alice.fetch_direct_messages(&bob_id).await.unwrap();
    alice.direct_message_threads().await.unwrap();

    alice.send_direct_message(&bob_id, "hey", None).await.unwrap();

    let queries = alice.queries();
    assert!(queries.state(&QueryKey::DirectMessages(bob_id.clone())).is_stale);
    assert!(queries.state(&QueryKey::DirectMessageThreads).is_stale);
    assert!(!queries.state(&QueryKey::GlobalMessages).is_fetching);

    let threads = alice.direct_message_threads().await.unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].last_message.as_ref().unwrap().content, "hey");
}

#[tokio::test]
async fn messaging_yourself_is_rejected() {
    let backend = MemoryBackend::new("seed");
    let alice = common::signed_up(&backend, "alice").await;
    let mut toasts = alice.notifications();

    let err = alice
        .send_direct_message(&UserId::from("alice"), "note to self", None)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Cannot message yourself");
    assert_eq!(common::drain(&mut toasts)[0].message, "Cannot message yourself");
}

#[tokio::test]
async fn direct_composer_sends_to_its_peer() {
    let backend = MemoryBackend::new("seed");
    let alice = common::signed_up(&backend, "alice").await;
    let bob = common::signed_up(&backend, "bob").await;
    let alice_id = UserId::from("alice");

    let mut composer = Composer::new(bob.clone(), ComposeTarget::Direct(alice_id.clone()));
    composer.set_draft("  lunch?  ");
    assert!(composer.can_send());
    assert!(composer.send().await.unwrap());
    assert_eq!(composer.draft(), "");

    let messages = alice.fetch_direct_messages(&UserId::from("bob")).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "lunch?");
    assert_eq!(messages[0].receiver_id, alice_id);
}

#[tokio::test]
async fn other_users_stats_need_admin() {
    let backend = MemoryBackend::new("seed");
    let alice = common::signed_up(&backend, "alice").await;
    let bob = common::signed_up(&backend, "bob").await;
    let alice_id = UserId::from("alice");

    bob.send_direct_message(&alice_id, "hi", None).await.unwrap();

    assert!(bob.all_direct_message_stats(&alice_id).await.is_err());
    let own = bob.all_direct_message_stats(&UserId::from("bob")).await.unwrap();
    assert_eq!(own.total_count, 1);
    // alice signed up first and is the admin
    let stats = alice.all_direct_message_stats(&UserId::from("bob")).await.unwrap();
    assert_eq!(stats.total_count, 1);
}
