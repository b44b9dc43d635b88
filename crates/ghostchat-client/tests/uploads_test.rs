mod common;

use ghostchat_client::{
    ClientError, ComposeTarget, Composer, LocalFile, MemoryBackend, NotificationLevel,
    UploadProgress,
};
use ghostchat_shared::constants::DEFAULT_AVATAR_URL;
use ghostchat_shared::ValidationError;

fn png(size: usize) -> LocalFile {
    LocalFile::new("photo.png", "image/png", vec![7u8; size])
}

#[tokio::test]
async fn rejected_files_never_reach_the_backend() {
    let backend = MemoryBackend::new("seed");
    let alice = common::signed_up(&backend, "alice").await;
    let mut toasts = alice.notifications();
    let progress = UploadProgress::default();
    let before = backend.call_count();

    let pdf = LocalFile::new("cv.pdf", "application/pdf", vec![0u8; 10]);
    let err = alice.upload_avatar_file(&pdf, &progress).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::UnsupportedImageType(_))
    ));

    let huge = png(alice.config().max_upload_size + 1);
    let err = alice.upload_avatar_file(&huge, &progress).await.unwrap_err();
    assert_eq!(err.to_string(), "File size must be less than 5MB");

    assert_eq!(backend.call_count(), before);
    let seen = common::drain(&mut toasts);
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|n| n.level == NotificationLevel::Error));
    assert_eq!(
        seen[0].message,
        "Please select a valid image file (JPG, PNG, or WebP)"
    );
}

#[tokio::test]
async fn avatar_upload_updates_profile_and_resets_progress() {
    let backend = MemoryBackend::new("seed");
    let alice = common::signed_up(&backend, "alice").await;
    let progress = UploadProgress::default();

    let profile = alice.caller_profile().await.unwrap();
    let avatar = ghostchat_client::views::AvatarView::for_profile(profile.as_ref().as_ref());
    assert_eq!(avatar.url, DEFAULT_AVATAR_URL);

    alice.upload_avatar_file(&png(64), &progress).await.unwrap();
    assert_eq!(progress.get(), 0);
    assert!(!progress.is_visible());

    let profile = alice.caller_profile().await.unwrap();
    let stored = profile.as_ref().as_ref().unwrap().avatar.clone().unwrap();
    let url = stored.direct_url().unwrap();
    assert_eq!(backend.blob_bytes(url).unwrap().len(), 64);
}

/// First non-zero progress value seen while an upload runs.
async fn first_progress(progress: &UploadProgress) -> u8 {
    loop {
        let pct = progress.get();
        if pct > 0 {
            return pct;
        }
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn failed_upload_also_resets_progress() {
    let backend = MemoryBackend::new("seed");
    let alice = common::signed_up(&backend, "alice").await;
    let progress = UploadProgress::default();

    backend.fail_next_transfers(1);
    let file = png(8);
    let (result, during) = tokio::join!(
        alice.upload_avatar_file(&file, &progress),
        first_progress(&progress),
    );

    assert_eq!(result.unwrap_err().to_string(), "Upload interrupted");
    assert!(during > 0);
    assert_eq!(progress.get(), 0);
    assert!(!progress.is_visible());
}

#[tokio::test]
async fn failed_composer_send_resets_progress_and_keeps_the_draft() {
    let backend = MemoryBackend::new("seed");
    let alice = common::signed_up(&backend, "alice").await;
    let mut composer = Composer::new(alice.clone(), ComposeTarget::Global);
    let progress = composer.progress().clone();

    composer.set_draft("look");
    assert!(composer.select_attachment(png(8)));

    backend.fail_next_transfers(1);
    let (result, during) = tokio::join!(composer.send(), first_progress(&progress));

    assert!(result.is_err());
    assert!(during > 0);
    assert_eq!(progress.get(), 0);
    assert_eq!(composer.draft(), "look");
    assert!(composer.attachment().is_some());
}

#[tokio::test]
async fn logo_and_admin_images_accept_any_image_type() {
    let backend = MemoryBackend::new("seed");
    let alice = common::signed_up(&backend, "alice").await;
    let progress = UploadProgress::default();

    let gif = LocalFile::new("spin.gif", "image/gif", vec![1u8; 32]);
    assert!(alice.check_upload(&gif, alice.attachment_policy()).is_err());

    let url = alice.upload_admin_image(&gif, &progress).await.unwrap();
    assert!(backend.blob_bytes(&url).is_some());

    let text = LocalFile::new("notes.txt", "text/plain", vec![1u8; 32]);
    let err = alice.upload_admin_image(&text, &progress).await.unwrap_err();
    assert_eq!(err.to_string(), "Please select an image file");
}

#[tokio::test]
async fn admin_images_allow_larger_files() {
    let backend = MemoryBackend::new("seed");
    let alice = common::signed_up(&backend, "alice").await;
    let progress = UploadProgress::default();
    let six_mb = png(6 * 1024 * 1024);

    assert!(alice.upload_admin_image(&six_mb, &progress).await.is_ok());
    let err = alice.upload_site_logo_file(&six_mb, &progress).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::FileTooLarge { .. })
    ));
}

#[tokio::test]
async fn composer_refuses_bad_attachments() {
    let backend = MemoryBackend::new("seed");
    let alice = common::signed_up(&backend, "alice").await;
    let mut composer = Composer::new(alice.clone(), ComposeTarget::Global);

    let bmp = LocalFile::new("old.bmp", "image/bmp", vec![0u8; 16]);
    assert!(!composer.select_attachment(bmp));
    assert!(composer.attachment().is_none());
    assert!(!composer.can_send());

    assert!(composer.select_attachment(png(16)));
    assert!(composer.can_send());
    assert!(composer.send().await.unwrap());
    assert!(composer.attachment().is_none());

    let messages = alice.fetch_global_messages().await.unwrap();
    assert_eq!(messages[0].content, "");
    assert!(messages[0].attachment.is_some());
}
