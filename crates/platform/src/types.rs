use serde::{Deserialize, Serialize};

use stashlink_core::{ButtonLayout, ChatId, MessageId, UserId};

/// Text formatting applied by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    Markdown,
    #[serde(rename = "HTML")]
    Html,
}

/// Options shared by every outgoing message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub parse_mode: Option<ParseMode>,
    pub reply_markup: Option<ButtonLayout>,
    pub disable_preview: bool,
    pub reply_to: Option<MessageId>,
}

impl SendOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn markdown() -> Self {
        Self::new().with_parse_mode(ParseMode::Markdown)
    }

    #[must_use]
    pub fn with_parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = Some(mode);
        self
    }

    /// Attach buttons. Empty layouts are dropped.
    #[must_use]
    pub fn with_markup(mut self, markup: ButtonLayout) -> Self {
        self.reply_markup = (!markup.is_empty()).then_some(markup);
        self
    }

    #[must_use]
    pub fn without_preview(mut self) -> Self {
        self.disable_preview = true;
        self
    }

    #[must_use]
    pub fn reply_to(mut self, message_id: MessageId) -> Self {
        self.reply_to = Some(message_id);
        self
    }
}

/// A user's standing in a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

impl MemberStatus {
    /// Whether the user currently belongs to the chat.
    pub fn is_present(self) -> bool {
        !matches!(self, Self::Left | Self::Kicked)
    }

    /// Whether the user can manage the chat.
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Creator | Self::Administrator)
    }
}

/// The bot's own account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotUser {
    pub id: UserId,
    pub username: String,
}

/// A media attachment on an incoming message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    /// Platform file id usable for re-sending.
    pub file_id: String,
    /// Stable id of the underlying file.
    pub file_unique_id: String,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub from: Option<UserId>,
    pub text: Option<String>,
    /// Set when the message was forwarded from a channel.
    pub forward_from_chat: Option<ChatId>,
    pub media: Option<Media>,
}

impl IncomingMessage {
    /// Whether the message was sent in the sender's private chat with the bot.
    pub fn is_private(&self) -> bool {
        self.from.is_some_and(|u| ChatId::from(u) == self.chat_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: UserId,
    pub data: Option<String>,
    /// Chat and message the pressed button belongs to.
    pub message: Option<(ChatId, MessageId)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateKind {
    Message(IncomingMessage),
    Callback(CallbackQuery),
    /// An update type the bot does not handle.
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub kind: UpdateKind,
}
