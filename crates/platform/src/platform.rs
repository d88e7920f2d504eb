use async_trait::async_trait;

use stashlink_core::{ChatId, MessageId, UserId};

use crate::error::PlatformError;
use crate::types::{BotUser, MemberStatus, SendOptions, Update};

/// Strongly-typed messaging platform client with native `async fn`.
///
/// Not object-safe. Use [`DynPlatform`] for dynamic dispatch; every
/// `Platform` implements it through a blanket implementation.
pub trait Platform: Send + Sync {
    /// The bot's own account.
    fn get_me(&self) -> impl Future<Output = Result<BotUser, PlatformError>> + Send;

    /// Long-poll for updates with id `>= offset`.
    fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u32,
    ) -> impl Future<Output = Result<Vec<Update>, PlatformError>> + Send;

    fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        opts: &SendOptions,
    ) -> impl Future<Output = Result<MessageId, PlatformError>> + Send;

    /// Send a photo by file id or URL.
    fn send_photo(
        &self,
        chat_id: ChatId,
        photo: &str,
        caption: &str,
        opts: &SendOptions,
    ) -> impl Future<Output = Result<MessageId, PlatformError>> + Send;

    /// Copy a message into another chat, optionally replacing its caption.
    fn copy_message(
        &self,
        chat_id: ChatId,
        from_chat_id: ChatId,
        message_id: MessageId,
        caption: Option<&str>,
        opts: &SendOptions,
    ) -> impl Future<Output = Result<MessageId, PlatformError>> + Send;

    /// Re-send a file already stored on the platform by its file id.
    fn send_cached_media(
        &self,
        chat_id: ChatId,
        file_id: &str,
        caption: &str,
        opts: &SendOptions,
    ) -> impl Future<Output = Result<MessageId, PlatformError>> + Send;

    fn edit_message_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        opts: &SendOptions,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    fn get_chat_member(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> impl Future<Output = Result<MemberStatus, PlatformError>> + Send;

    fn export_chat_invite_link(
        &self,
        chat_id: ChatId,
    ) -> impl Future<Output = Result<String, PlatformError>> + Send;

    /// Acknowledge a button press, optionally with a toast or alert.
    fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;
}

/// Object-safe platform trait for use behind `Arc<dyn DynPlatform>`.
///
/// Implement [`Platform`] instead and rely on the blanket implementation.
#[async_trait]
pub trait DynPlatform: Send + Sync {
    async fn get_me(&self) -> Result<BotUser, PlatformError>;

    async fn get_updates(&self, offset: i64, timeout_secs: u32)
    -> Result<Vec<Update>, PlatformError>;

    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        opts: &SendOptions,
    ) -> Result<MessageId, PlatformError>;

    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: &str,
        caption: &str,
        opts: &SendOptions,
    ) -> Result<MessageId, PlatformError>;

    async fn copy_message(
        &self,
        chat_id: ChatId,
        from_chat_id: ChatId,
        message_id: MessageId,
        caption: Option<&str>,
        opts: &SendOptions,
    ) -> Result<MessageId, PlatformError>;

    async fn send_cached_media(
        &self,
        chat_id: ChatId,
        file_id: &str,
        caption: &str,
        opts: &SendOptions,
    ) -> Result<MessageId, PlatformError>;

    async fn edit_message_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        opts: &SendOptions,
    ) -> Result<(), PlatformError>;

    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), PlatformError>;

    async fn get_chat_member(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<MemberStatus, PlatformError>;

    async fn export_chat_invite_link(&self, chat_id: ChatId) -> Result<String, PlatformError>;

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), PlatformError>;
}

#[async_trait]
impl<T: Platform + Sync> DynPlatform for T {
    async fn get_me(&self) -> Result<BotUser, PlatformError> {
        Platform::get_me(self).await
    }

    async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u32,
    ) -> Result<Vec<Update>, PlatformError> {
        Platform::get_updates(self, offset, timeout_secs).await
    }

    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        opts: &SendOptions,
    ) -> Result<MessageId, PlatformError> {
        Platform::send_message(self, chat_id, text, opts).await
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: &str,
        caption: &str,
        opts: &SendOptions,
    ) -> Result<MessageId, PlatformError> {
        Platform::send_photo(self, chat_id, photo, caption, opts).await
    }

    async fn copy_message(
        &self,
        chat_id: ChatId,
        from_chat_id: ChatId,
        message_id: MessageId,
        caption: Option<&str>,
        opts: &SendOptions,
    ) -> Result<MessageId, PlatformError> {
        Platform::copy_message(self, chat_id, from_chat_id, message_id, caption, opts).await
    }

    async fn send_cached_media(
        &self,
        chat_id: ChatId,
        file_id: &str,
        caption: &str,
        opts: &SendOptions,
    ) -> Result<MessageId, PlatformError> {
        Platform::send_cached_media(self, chat_id, file_id, caption, opts).await
    }

    async fn edit_message_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        opts: &SendOptions,
    ) -> Result<(), PlatformError> {
        Platform::edit_message_text(self, chat_id, message_id, text, opts).await
    }

    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), PlatformError> {
        Platform::delete_message(self, chat_id, message_id).await
    }

    async fn get_chat_member(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<MemberStatus, PlatformError> {
        Platform::get_chat_member(self, chat_id, user_id).await
    }

    async fn export_chat_invite_link(&self, chat_id: ChatId) -> Result<String, PlatformError> {
        Platform::export_chat_invite_link(self, chat_id).await
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), PlatformError> {
        Platform::answer_callback(self, callback_id, text, show_alert).await
    }
}
