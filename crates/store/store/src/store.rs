use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};

use stashlink_core::{
    BackupPost, ChatId, Conversation, FileRecord, OwnerSettings, SettingsUpdate, UserId,
};

use crate::error::StoreError;

/// Persistence for users, stored files, verification grants, view counters,
/// backup posts, and open conversations.
///
/// Implementations must be `Send + Sync` and safe for concurrent access.
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch an owner's settings. Returns `None` for unknown users.
    async fn get_user(&self, user_id: UserId) -> Result<Option<OwnerSettings>, StoreError>;

    /// Register a user with default settings.
    /// Returns `true` if the user was newly added, `false` if already known.
    async fn add_user(&self, user_id: UserId) -> Result<bool, StoreError>;

    /// Apply a single-field update to an existing user.
    ///
    /// Fails with [`StoreError::NotFound`] when the user is unknown.
    async fn update_user(&self, user_id: UserId, update: SettingsUpdate)
    -> Result<(), StoreError>;

    /// Record a stored file, replacing any previous record for the same
    /// `(owner_id, file_unique_id)`.
    async fn save_file(&self, record: FileRecord) -> Result<(), StoreError>;

    /// Look up a file by owner and unique id.
    async fn get_file_by_unique_id(
        &self,
        owner_id: UserId,
        file_unique_id: &str,
    ) -> Result<Option<FileRecord>, StoreError>;

    /// Whether `requester_id` holds an unexpired grant for `owner_id` at `now`.
    async fn is_user_verified(
        &self,
        requester_id: UserId,
        owner_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Atomically create a grant lasting `window` unless an active one exists.
    /// Returns `true` if a new grant was created.
    async fn claim_verification_for_file(
        &self,
        owner_id: UserId,
        file_unique_id: &str,
        requester_id: UserId,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<bool, StoreError>;

    /// Count one view of an owner's content on the day of `now`.
    async fn record_daily_view(
        &self,
        owner_id: UserId,
        requester_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Views counted for an owner on a given day.
    async fn daily_views(&self, owner_id: UserId, day: NaiveDate) -> Result<u64, StoreError>;

    /// Remember a post published to one of an owner's channels.
    async fn save_backup_post(&self, post: BackupPost) -> Result<(), StoreError>;

    /// Every saved post for `(owner_id, channel_id)`, in publication order.
    async fn get_posts_for_backup(
        &self,
        owner_id: UserId,
        channel_id: ChatId,
    ) -> Result<Vec<BackupPost>, StoreError>;

    /// Delete every saved post for `(owner_id, channel_id)`.
    /// Returns the number of posts removed.
    async fn delete_posts_from_channel(
        &self,
        owner_id: UserId,
        channel_id: ChatId,
    ) -> Result<u64, StoreError>;

    /// Persist a user's open conversation, replacing any previous one.
    async fn save_conversation(&self, conversation: &Conversation) -> Result<(), StoreError>;

    /// The user's open conversation, if any.
    async fn get_conversation(&self, user_id: UserId)
    -> Result<Option<Conversation>, StoreError>;

    /// Drop a user's conversation. Returns `true` if one existed.
    async fn clear_conversation(&self, user_id: UserId) -> Result<bool, StoreError>;

    /// Every persisted conversation.
    async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError>;
}
