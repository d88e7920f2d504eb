use chrono::{DateTime, Duration, TimeZone, Utc};

use stashlink_core::{
    BackupPost, Button, ButtonLayout, ChatId, Conversation, ConversationState, FileRecord,
    MessageId, SettingsUpdate, ShortenerMode, UserId, verification_window,
};

use crate::error::StoreError;
use crate::store::Store;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Run the full store conformance test suite.
///
/// Call this from your backend's test module with a fresh store instance.
///
/// # Errors
///
/// Returns an error if any store call fails. Assertion failures panic.
pub async fn run_store_conformance_tests(store: &dyn Store) -> Result<(), StoreError> {
    test_user_lifecycle(store).await?;
    test_update_missing_user(store).await?;
    test_files(store).await?;
    test_claim_verification(store).await?;
    test_grants_are_per_owner(store).await?;
    test_daily_views(store).await?;
    test_backup_posts(store).await?;
    test_conversations(store).await?;
    Ok(())
}

async fn test_user_lifecycle(store: &dyn Store) -> Result<(), StoreError> {
    let user = UserId::new(1001);
    assert!(store.get_user(user).await?.is_none());
    assert!(store.add_user(user).await?, "first add should be new");
    assert!(!store.add_user(user).await?, "second add should not be new");

    let settings = store.get_user(user).await?;
    assert!(settings.is_some_and(|s| s.shortener_enabled));

    store
        .update_user(user, SettingsUpdate::ShortenerMode(ShortenerMode::TwelveHour))
        .await?;
    store
        .update_user(user, SettingsUpdate::FsubChannel(Some(ChatId::new(-500))))
        .await?;
    let settings = store.get_user(user).await?;
    assert!(settings.as_ref().is_some_and(|s| s.shortener_mode == ShortenerMode::TwelveHour));
    assert!(settings.is_some_and(|s| s.fsub_channel == Some(ChatId::new(-500))));
    Ok(())
}

async fn test_update_missing_user(store: &dyn Store) -> Result<(), StoreError> {
    let result = store
        .update_user(UserId::new(1999), SettingsUpdate::ShortenerEnabled(false))
        .await;
    assert!(
        matches!(result, Err(StoreError::NotFound(_))),
        "update on unknown user should fail with NotFound"
    );
    Ok(())
}

async fn test_files(store: &dyn Store) -> Result<(), StoreError> {
    let owner = UserId::new(1002);
    let record = FileRecord {
        owner_id: owner,
        file_unique_id: "AgAD_file".into(),
        file_name: "clip.mp4".into(),
        file_id: MessageId::new(11),
        stream_id: MessageId::new(11),
    };
    store.save_file(record.clone()).await?;
    assert_eq!(
        store.get_file_by_unique_id(owner, "AgAD_file").await?,
        Some(record)
    );
    assert!(
        store
            .get_file_by_unique_id(UserId::new(1003), "AgAD_file")
            .await?
            .is_none(),
        "files are scoped to their owner"
    );
    Ok(())
}

async fn test_claim_verification(store: &dyn Store) -> Result<(), StoreError> {
    let owner = UserId::new(1004);
    let requester = UserId::new(2004);
    let window = verification_window();
    let now = t0();

    assert!(!store.is_user_verified(requester, owner, now).await?);
    assert!(
        store
            .claim_verification_for_file(owner, "f", requester, now, window)
            .await?,
        "first claim should grant"
    );
    assert!(
        !store
            .claim_verification_for_file(owner, "f", requester, now + Duration::hours(1), window)
            .await?,
        "claim within window should be a no-op"
    );
    assert!(
        store
            .is_user_verified(requester, owner, now + Duration::hours(11))
            .await?
    );
    assert!(
        !store
            .is_user_verified(requester, owner, now + Duration::hours(12))
            .await?,
        "grant should expire after the window"
    );
    assert!(
        store
            .claim_verification_for_file(
                owner,
                "f",
                requester,
                now + Duration::hours(12) + Duration::minutes(1),
                window
            )
            .await?,
        "claim after expiry should grant again"
    );
    Ok(())
}

async fn test_grants_are_per_owner(store: &dyn Store) -> Result<(), StoreError> {
    let requester = UserId::new(2005);
    let now = t0();
    store
        .claim_verification_for_file(UserId::new(1005), "f", requester, now, verification_window())
        .await?;
    assert!(
        !store
            .is_user_verified(requester, UserId::new(1006), now)
            .await?,
        "grant for one owner must not verify another"
    );
    Ok(())
}

async fn test_daily_views(store: &dyn Store) -> Result<(), StoreError> {
    let owner = UserId::new(1007);
    let now = t0();
    store.record_daily_view(owner, UserId::new(1), now).await?;
    store.record_daily_view(owner, UserId::new(2), now).await?;
    store
        .record_daily_view(owner, UserId::new(1), now + Duration::days(1))
        .await?;
    assert_eq!(store.daily_views(owner, now.date_naive()).await?, 2);
    assert_eq!(
        store
            .daily_views(owner, (now + Duration::days(1)).date_naive())
            .await?,
        1
    );
    Ok(())
}

async fn test_backup_posts(store: &dyn Store) -> Result<(), StoreError> {
    let owner = UserId::new(1008);
    let channel = ChatId::new(-1008);
    for i in 0..3 {
        store
            .save_backup_post(BackupPost {
                owner_id: owner,
                channel_id: channel,
                caption: format!("post {i}"),
                poster: None,
                reply_markup: Some(ButtonLayout::single(Button::url("Get", "https://x"))),
            })
            .await?;
    }
    let posts = store.get_posts_for_backup(owner, channel).await?;
    let captions: Vec<_> = posts.iter().map(|p| p.caption.as_str()).collect();
    assert_eq!(captions, ["post 0", "post 1", "post 2"], "order preserved");

    assert!(
        store
            .get_posts_for_backup(owner, ChatId::new(-9))
            .await?
            .is_empty()
    );
    assert_eq!(store.delete_posts_from_channel(owner, channel).await?, 3);
    assert!(store.get_posts_for_backup(owner, channel).await?.is_empty());
    assert_eq!(store.delete_posts_from_channel(owner, channel).await?, 0);
    Ok(())
}

async fn test_conversations(store: &dyn Store) -> Result<(), StoreError> {
    let user = UserId::new(1009);
    let conv = Conversation::open(user, ConversationState::FooterText, t0());
    store.save_conversation(&conv).await?;
    assert_eq!(store.get_conversation(user).await?, Some(conv.clone()));
    assert!(
        store
            .list_conversations()
            .await?
            .iter()
            .any(|c| c.user_id == user)
    );

    let next = conv.advance(
        ConversationState::FooterUrl {
            text: "Join".into(),
        },
        t0(),
    );
    store.save_conversation(&next).await?;
    assert_eq!(store.get_conversation(user).await?, Some(next));

    assert!(store.clear_conversation(user).await?);
    assert!(!store.clear_conversation(user).await?);
    assert!(store.get_conversation(user).await?.is_none());
    Ok(())
}
