use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use stashlink_core::{ChatId, MessageId, UserId};
use stashlink_platform::{BotUser, MemberStatus, Platform, PlatformError, SendOptions, Update};

use crate::config::TelegramConfig;
use crate::error::TelegramError;
use crate::types::{
    AnswerCallbackRequest, ApiResponse, ChatRequest, CopyMessageRequest, DeleteMessageRequest,
    EditMessageTextRequest, GetChatMemberRequest, GetUpdatesRequest, MessageIdResult,
    SendDocumentRequest, SendMessageRequest, SendPhotoRequest, WireChatMember, WireMessage,
    WireUpdate, WireUser,
};

const ALLOWED_UPDATES: &[&str] = &["message", "callback_query"];

/// Telegram Bot API client.
///
/// Implements [`Platform`] by POSTing JSON bodies to
/// `<api_base_url>/bot<token>/<method>`.
pub struct TelegramClient {
    config: TelegramConfig,
    client: Client,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    /// Create a new client with the given configuration.
    pub fn new(config: TelegramConfig) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("failed to build HTTP client");
        Self { config, client }
    }

    /// Create a new client with a custom HTTP client.
    pub fn with_client(config: TelegramConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// Transport errors carry the request URL, which embeds the bot token.
    fn transport_error(&self, err: reqwest::Error) -> TelegramError {
        if err.is_timeout() {
            TelegramError::Timeout(self.config.request_timeout)
        } else {
            TelegramError::Http(err.without_url())
        }
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, TelegramError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        debug!(method, "calling Telegram Bot API");

        let response = self
            .client
            .post(self.config.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;
        let envelope = serde_json::from_str::<ApiResponse<T>>(&text);

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = envelope
                .ok()
                .and_then(|e| e.parameters)
                .and_then(|p| p.retry_after)
                .map(Duration::from_secs);
            warn!(method, ?retry_after, "Telegram API rate limit hit");
            return Err(TelegramError::RateLimited { retry_after });
        }

        let envelope = match envelope {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(TelegramError::Api {
                    code: status.as_u16(),
                    description: format!("HTTP {status}: {text}"),
                });
            }
            Err(e) => return Err(TelegramError::InvalidResponse(e.to_string())),
        };

        if !envelope.ok {
            return Err(TelegramError::Api {
                code: envelope.error_code.unwrap_or_else(|| status.as_u16()),
                description: envelope.description.unwrap_or_default(),
            });
        }

        envelope
            .result
            .ok_or_else(|| TelegramError::InvalidResponse(format!("{method}: missing result")))
    }
}

impl Platform for TelegramClient {
    #[instrument(skip(self), fields(platform = "telegram"))]
    async fn get_me(&self) -> Result<BotUser, PlatformError> {
        let user: WireUser = self.call("getMe", &serde_json::json!({})).await?;
        let username = user.username.ok_or_else(|| {
            PlatformError::Configuration("bot account has no username".into())
        })?;
        Ok(BotUser {
            id: user.id,
            username,
        })
    }

    async fn get_updates(&self, offset: i64, timeout_secs: u32) -> Result<Vec<Update>, PlatformError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: timeout_secs,
            allowed_updates: ALLOWED_UPDATES,
        };
        let updates: Vec<WireUpdate> = self.call("getUpdates", &request).await?;
        Ok(updates.into_iter().map(Update::from).collect())
    }

    #[instrument(skip(self, text, opts), fields(platform = "telegram"))]
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        opts: &SendOptions,
    ) -> Result<MessageId, PlatformError> {
        let request = SendMessageRequest::new(chat_id, text, opts);
        let sent: WireMessage = self.call("sendMessage", &request).await?;
        Ok(sent.message_id)
    }

    #[instrument(skip(self, photo, caption, opts), fields(platform = "telegram"))]
    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: &str,
        caption: &str,
        opts: &SendOptions,
    ) -> Result<MessageId, PlatformError> {
        let request = SendPhotoRequest {
            chat_id,
            photo,
            caption,
            options: opts.into(),
        };
        let sent: WireMessage = self.call("sendPhoto", &request).await?;
        Ok(sent.message_id)
    }

    #[instrument(skip(self, caption, opts), fields(platform = "telegram"))]
    async fn copy_message(
        &self,
        chat_id: ChatId,
        from_chat_id: ChatId,
        message_id: MessageId,
        caption: Option<&str>,
        opts: &SendOptions,
    ) -> Result<MessageId, PlatformError> {
        let request = CopyMessageRequest {
            chat_id,
            from_chat_id,
            message_id,
            caption,
            options: opts.into(),
        };
        let copied: MessageIdResult = self.call("copyMessage", &request).await?;
        Ok(copied.message_id)
    }

    #[instrument(skip(self, file_id, caption, opts), fields(platform = "telegram"))]
    async fn send_cached_media(
        &self,
        chat_id: ChatId,
        file_id: &str,
        caption: &str,
        opts: &SendOptions,
    ) -> Result<MessageId, PlatformError> {
        let request = SendDocumentRequest {
            chat_id,
            document: file_id,
            caption,
            options: opts.into(),
        };
        let sent: WireMessage = self.call("sendDocument", &request).await?;
        Ok(sent.message_id)
    }

    async fn edit_message_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        opts: &SendOptions,
    ) -> Result<(), PlatformError> {
        let request = EditMessageTextRequest::new(chat_id, message_id, text, opts);
        let _: serde_json::Value = self.call("editMessageText", &request).await?;
        Ok(())
    }

    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), PlatformError> {
        let request = DeleteMessageRequest {
            chat_id,
            message_id,
        };
        let _: bool = self.call("deleteMessage", &request).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(platform = "telegram"))]
    async fn get_chat_member(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<MemberStatus, PlatformError> {
        let request = GetChatMemberRequest { chat_id, user_id };
        let member: WireChatMember = self.call("getChatMember", &request).await?;
        Ok(member.status.into())
    }

    #[instrument(skip(self), fields(platform = "telegram"))]
    async fn export_chat_invite_link(&self, chat_id: ChatId) -> Result<String, PlatformError> {
        Ok(self
            .call("exportChatInviteLink", &ChatRequest { chat_id })
            .await?)
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), PlatformError> {
        let request = AnswerCallbackRequest {
            callback_query_id: callback_id,
            text,
            show_alert,
        };
        let _: bool = self.call("answerCallbackQuery", &request).await?;
        Ok(())
    }
}
