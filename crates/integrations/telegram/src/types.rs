//! Bot API wire types.

use serde::{Deserialize, Serialize};

use stashlink_core::{ButtonLayout, ChatId, MessageId, UserId};
use stashlink_platform::{
    CallbackQuery, IncomingMessage, Media, MemberStatus, ParseMode, SendOptions, Update,
    UpdateKind,
};

/// Envelope wrapping every Bot API response.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<u16>,
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseParameters {
    pub retry_after: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyParameters {
    pub message_id: MessageId,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkPreviewOptions {
    pub is_disabled: bool,
}

/// Options shared by every send-like method.
#[derive(Debug, Clone, Serialize)]
pub struct WireOptions<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<&'a ButtonLayout>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_parameters: Option<ReplyParameters>,
}

impl<'a> From<&'a SendOptions> for WireOptions<'a> {
    fn from(opts: &'a SendOptions) -> Self {
        Self {
            parse_mode: opts.parse_mode,
            reply_markup: opts.reply_markup.as_ref(),
            reply_parameters: opts.reply_to.map(|message_id| ReplyParameters { message_id }),
        }
    }
}

fn link_preview(opts: &SendOptions) -> Option<LinkPreviewOptions> {
    opts.disable_preview
        .then_some(LinkPreviewOptions { is_disabled: true })
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub chat_id: ChatId,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_preview_options: Option<LinkPreviewOptions>,
    #[serde(flatten)]
    pub options: WireOptions<'a>,
}

impl<'a> SendMessageRequest<'a> {
    pub fn new(chat_id: ChatId, text: &'a str, opts: &'a SendOptions) -> Self {
        Self {
            chat_id,
            text,
            link_preview_options: link_preview(opts),
            options: opts.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SendPhotoRequest<'a> {
    pub chat_id: ChatId,
    pub photo: &'a str,
    pub caption: &'a str,
    #[serde(flatten)]
    pub options: WireOptions<'a>,
}

#[derive(Debug, Serialize)]
pub struct SendDocumentRequest<'a> {
    pub chat_id: ChatId,
    pub document: &'a str,
    pub caption: &'a str,
    #[serde(flatten)]
    pub options: WireOptions<'a>,
}

#[derive(Debug, Serialize)]
pub struct CopyMessageRequest<'a> {
    pub chat_id: ChatId,
    pub from_chat_id: ChatId,
    pub message_id: MessageId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<&'a str>,
    #[serde(flatten)]
    pub options: WireOptions<'a>,
}

#[derive(Debug, Serialize)]
pub struct EditMessageTextRequest<'a> {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_preview_options: Option<LinkPreviewOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<&'a ButtonLayout>,
}

impl<'a> EditMessageTextRequest<'a> {
    pub fn new(
        chat_id: ChatId,
        message_id: MessageId,
        text: &'a str,
        opts: &'a SendOptions,
    ) -> Self {
        Self {
            chat_id,
            message_id,
            text,
            link_preview_options: link_preview(opts),
            parse_mode: opts.parse_mode,
            reply_markup: opts.reply_markup.as_ref(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteMessageRequest {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

#[derive(Debug, Serialize)]
pub struct GetChatMemberRequest {
    pub chat_id: ChatId,
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub chat_id: ChatId,
}

#[derive(Debug, Serialize)]
pub struct AnswerCallbackRequest<'a> {
    pub callback_query_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
    pub show_alert: bool,
}

#[derive(Debug, Serialize)]
pub struct GetUpdatesRequest {
    pub offset: i64,
    pub timeout: u32,
    pub allowed_updates: &'static [&'static str],
}

#[derive(Debug, Deserialize)]
pub struct MessageIdResult {
    pub message_id: MessageId,
}

#[derive(Debug, Deserialize)]
pub struct WireUser {
    pub id: UserId,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireChat {
    pub id: ChatId,
}

#[derive(Debug, Deserialize)]
pub struct WireFile {
    pub file_id: String,
    pub file_unique_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl From<WireFile> for Media {
    fn from(f: WireFile) -> Self {
        Self {
            file_id: f.file_id,
            file_unique_id: f.file_unique_id,
            file_name: f.file_name,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ForwardOrigin {
    Channel { chat: WireChat },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct WireMessage {
    pub message_id: MessageId,
    pub chat: WireChat,
    #[serde(default)]
    pub from: Option<WireUser>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub forward_origin: Option<ForwardOrigin>,
    #[serde(default)]
    pub forward_from_chat: Option<WireChat>,
    #[serde(default)]
    pub document: Option<WireFile>,
    #[serde(default)]
    pub video: Option<WireFile>,
    #[serde(default)]
    pub audio: Option<WireFile>,
}

impl From<WireMessage> for IncomingMessage {
    fn from(m: WireMessage) -> Self {
        let forward_from_chat = match m.forward_origin {
            Some(ForwardOrigin::Channel { chat }) => Some(chat.id),
            _ => m.forward_from_chat.map(|c| c.id),
        };
        Self {
            chat_id: m.chat.id,
            message_id: m.message_id,
            from: m.from.map(|u| u.id),
            text: m.text,
            forward_from_chat,
            media: m.document.or(m.video).or(m.audio).map(Media::from),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WireCallbackQuery {
    pub id: String,
    pub from: WireUser,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub message: Option<WireMessage>,
}

#[derive(Debug, Deserialize)]
pub struct WireUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<WireMessage>,
    #[serde(default)]
    pub callback_query: Option<WireCallbackQuery>,
}

impl From<WireUpdate> for Update {
    fn from(u: WireUpdate) -> Self {
        let kind = if let Some(m) = u.message {
            UpdateKind::Message(m.into())
        } else if let Some(q) = u.callback_query {
            UpdateKind::Callback(CallbackQuery {
                id: q.id,
                from: q.from.id,
                data: q.data,
                message: q.message.map(|m| (m.chat.id, m.message_id)),
            })
        } else {
            UpdateKind::Other
        };
        Self {
            update_id: u.update_id,
            kind,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WireChatMember {
    pub status: WireMemberStatus,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireMemberStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

impl From<WireMemberStatus> for MemberStatus {
    fn from(s: WireMemberStatus) -> Self {
        match s {
            WireMemberStatus::Creator => Self::Creator,
            WireMemberStatus::Administrator => Self::Administrator,
            WireMemberStatus::Member => Self::Member,
            WireMemberStatus::Restricted => Self::Restricted,
            WireMemberStatus::Left => Self::Left,
            WireMemberStatus::Kicked => Self::Kicked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stashlink_core::Button;

    #[test]
    fn send_message_serializes_markup_and_preview() {
        let opts = SendOptions::markdown()
            .with_markup(ButtonLayout::single(Button::url("Get", "https://t.me/b")))
            .without_preview();
        let req = SendMessageRequest::new(ChatId::new(9), "hi", &opts);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["chat_id"], 9);
        assert_eq!(json["parse_mode"], "Markdown");
        assert_eq!(json["link_preview_options"]["is_disabled"], true);
        assert_eq!(
            json["reply_markup"]["inline_keyboard"][0][0]["url"],
            "https://t.me/b"
        );
        assert!(json.get("reply_parameters").is_none());
    }

    #[test]
    fn forwarded_channel_message() {
        let json = serde_json::json!({
            "update_id": 10,
            "message": {
                "message_id": 5,
                "chat": {"id": 42, "type": "private"},
                "from": {"id": 42, "is_bot": false, "first_name": "A"},
                "forward_origin": {
                    "type": "channel",
                    "chat": {"id": -1001, "type": "channel"},
                    "message_id": 7,
                    "date": 0
                }
            }
        });
        let update: Update = serde_json::from_value::<WireUpdate>(json).unwrap().into();
        let UpdateKind::Message(msg) = update.kind else {
            panic!("expected message");
        };
        assert_eq!(msg.forward_from_chat, Some(ChatId::new(-1001)));
        assert!(msg.is_private());
    }

    #[test]
    fn user_forward_origin_is_ignored() {
        let json = serde_json::json!({
            "message_id": 5,
            "chat": {"id": 42},
            "forward_origin": {"type": "user", "sender_user": {"id": 1}, "date": 0}
        });
        let msg: IncomingMessage = serde_json::from_value::<WireMessage>(json).unwrap().into();
        assert!(msg.forward_from_chat.is_none());
    }

    #[test]
    fn document_becomes_media() {
        let json = serde_json::json!({
            "message_id": 5,
            "chat": {"id": 42},
            "from": {"id": 42},
            "document": {"file_id": "BQAC", "file_unique_id": "AgAD", "file_name": "a.pdf"}
        });
        let msg: IncomingMessage = serde_json::from_value::<WireMessage>(json).unwrap().into();
        let media = msg.media.unwrap();
        assert_eq!(media.file_unique_id, "AgAD");
        assert_eq!(media.file_name.as_deref(), Some("a.pdf"));
    }

    #[test]
    fn callback_query_update() {
        let json = serde_json::json!({
            "update_id": 11,
            "callback_query": {
                "id": "cb1",
                "from": {"id": 9},
                "data": "retry_get_5_abc",
                "message": {"message_id": 3, "chat": {"id": 9}}
            }
        });
        let update: Update = serde_json::from_value::<WireUpdate>(json).unwrap().into();
        let UpdateKind::Callback(q) = update.kind else {
            panic!("expected callback");
        };
        assert_eq!(q.data.as_deref(), Some("retry_get_5_abc"));
        assert_eq!(q.message, Some((ChatId::new(9), MessageId::new(3))));
    }

    #[test]
    fn unhandled_update_kind() {
        let update: Update = serde_json::from_value::<WireUpdate>(serde_json::json!({
            "update_id": 12,
            "edited_message": {"message_id": 1, "chat": {"id": 1}}
        }))
        .unwrap()
        .into();
        assert_eq!(update.kind, UpdateKind::Other);
    }
}
