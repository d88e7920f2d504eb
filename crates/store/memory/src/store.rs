use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use stashlink_core::{
    BackupPost, ChatId, Conversation, FileRecord, OwnerSettings, SettingsUpdate, UserId,
    VerificationGrant,
};
use stashlink_store::{Store, StoreError};

/// In-memory [`Store`] backed by [`DashMap`]s.
///
/// Grant expiry is evaluated lazily on read; expired grants stay in the map
/// until the next claim for the same pair overwrites them.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<UserId, OwnerSettings>,
    files: DashMap<(UserId, String), FileRecord>,
    /// Keyed by `(requester, owner)`.
    grants: DashMap<(UserId, UserId), VerificationGrant>,
    views: DashMap<(UserId, NaiveDate), u64>,
    posts: DashMap<(UserId, ChatId), Vec<BackupPost>>,
    conversations: DashMap<UserId, Conversation>,
}

impl MemoryStore {
    /// Create a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_user(&self, user_id: UserId) -> Result<Option<OwnerSettings>, StoreError> {
        Ok(self.users.get(&user_id).map(|s| s.value().clone()))
    }

    async fn add_user(&self, user_id: UserId) -> Result<bool, StoreError> {
        match self.users.entry(user_id) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(OwnerSettings::new(user_id));
                Ok(true)
            }
        }
    }

    async fn update_user(
        &self,
        user_id: UserId,
        update: SettingsUpdate,
    ) -> Result<(), StoreError> {
        let mut settings = self
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))?;
        update.apply(&mut settings);
        Ok(())
    }

    async fn save_file(&self, record: FileRecord) -> Result<(), StoreError> {
        self.files
            .insert((record.owner_id, record.file_unique_id.clone()), record);
        Ok(())
    }

    async fn get_file_by_unique_id(
        &self,
        owner_id: UserId,
        file_unique_id: &str,
    ) -> Result<Option<FileRecord>, StoreError> {
        Ok(self
            .files
            .get(&(owner_id, file_unique_id.to_owned()))
            .map(|r| r.value().clone()))
    }

    async fn is_user_verified(
        &self,
        requester_id: UserId,
        owner_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        Ok(self
            .grants
            .get(&(requester_id, owner_id))
            .is_some_and(|g| g.is_active(now)))
    }

    async fn claim_verification_for_file(
        &self,
        owner_id: UserId,
        file_unique_id: &str,
        requester_id: UserId,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<bool, StoreError> {
        let grant = || VerificationGrant::new(requester_id, owner_id, file_unique_id, now, window);
        match self.grants.entry((requester_id, owner_id)) {
            Entry::Occupied(mut existing) => {
                if existing.get().is_active(now) {
                    Ok(false)
                } else {
                    existing.insert(grant());
                    Ok(true)
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(grant());
                Ok(true)
            }
        }
    }

    async fn record_daily_view(
        &self,
        owner_id: UserId,
        _requester_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        *self.views.entry((owner_id, now.date_naive())).or_insert(0) += 1;
        Ok(())
    }

    async fn daily_views(&self, owner_id: UserId, day: NaiveDate) -> Result<u64, StoreError> {
        Ok(self.views.get(&(owner_id, day)).map_or(0, |v| *v))
    }

    async fn save_backup_post(&self, post: BackupPost) -> Result<(), StoreError> {
        self.posts
            .entry((post.owner_id, post.channel_id))
            .or_default()
            .push(post);
        Ok(())
    }

    async fn get_posts_for_backup(
        &self,
        owner_id: UserId,
        channel_id: ChatId,
    ) -> Result<Vec<BackupPost>, StoreError> {
        Ok(self
            .posts
            .get(&(owner_id, channel_id))
            .map(|p| p.value().clone())
            .unwrap_or_default())
    }

    async fn delete_posts_from_channel(
        &self,
        owner_id: UserId,
        channel_id: ChatId,
    ) -> Result<u64, StoreError> {
        Ok(self
            .posts
            .remove(&(owner_id, channel_id))
            .map_or(0, |(_, posts)| posts.len() as u64))
    }

    async fn save_conversation(&self, conversation: &Conversation) -> Result<(), StoreError> {
        self.conversations
            .insert(conversation.user_id, conversation.clone());
        Ok(())
    }

    async fn get_conversation(
        &self,
        user_id: UserId,
    ) -> Result<Option<Conversation>, StoreError> {
        Ok(self.conversations.get(&user_id).map(|c| c.value().clone()))
    }

    async fn clear_conversation(&self, user_id: UserId) -> Result<bool, StoreError> {
        Ok(self.conversations.remove(&user_id).is_some())
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        Ok(self
            .conversations
            .iter()
            .map(|c| c.value().clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    #[tokio::test]
    async fn conformance() {
        let store = MemoryStore::new();
        stashlink_store::testing::run_store_conformance_tests(&store)
            .await
            .expect("conformance tests should pass");
    }

    #[tokio::test]
    async fn concurrent_claims_grant_once() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .claim_verification_for_file(
                        UserId::new(5),
                        "abc",
                        UserId::new(9),
                        now,
                        Duration::hours(12),
                    )
                    .await
                    .unwrap()
            }));
        }
        let mut granted = 0;
        for h in handles {
            if h.await.unwrap() {
                granted += 1;
            }
        }
        assert_eq!(granted, 1);
    }

    #[tokio::test]
    async fn removing_a_user_channel_keeps_other_posts() {
        let store = MemoryStore::new();
        let owner = UserId::new(1);
        for channel in [ChatId::new(-1), ChatId::new(-2)] {
            store
                .save_backup_post(BackupPost {
                    owner_id: owner,
                    channel_id: channel,
                    caption: "c".into(),
                    poster: None,
                    reply_markup: None,
                })
                .await
                .unwrap();
        }
        assert_eq!(
            store
                .delete_posts_from_channel(owner, ChatId::new(-1))
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            store
                .get_posts_for_backup(owner, ChatId::new(-2))
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
