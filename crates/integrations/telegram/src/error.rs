use std::time::Duration;

use stashlink_platform::PlatformError;
use thiserror::Error;

/// Errors specific to the Telegram client.
///
/// Converted into [`PlatformError`] at the public API boundary.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// An HTTP-level transport error occurred.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request did not complete within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The Bot API answered with `ok: false`.
    #[error("Telegram API error {code}: {description}")]
    Api { code: u16, description: String },

    /// HTTP 429 (Too Many Requests).
    #[error("rate limited by Telegram")]
    RateLimited { retry_after: Option<Duration> },

    /// The response body was not a valid Bot API envelope.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Map a Bot API error description onto the platform condition it reports.
fn classify(description: &str) -> Option<PlatformError> {
    let lower = description.to_ascii_lowercase();
    let has = |needle: &str| lower.contains(needle);

    if has("bot was blocked by the user") || has("user is deactivated") {
        Some(PlatformError::UserBlocked)
    } else if has("peer_id_invalid") {
        Some(PlatformError::PeerIdInvalid)
    } else if has("channel_private") {
        Some(PlatformError::ChannelPrivate)
    } else if has("channel_invalid") || has("bot was kicked") {
        Some(PlatformError::ChannelInvalid)
    } else if has("chat not found") {
        Some(PlatformError::ChatNotFound)
    } else if has("not enough rights")
        || has("chat_admin_required")
        || has("need administrator rights")
        || has("member list is inaccessible")
    {
        Some(PlatformError::AdminRequired)
    } else if has("user_not_participant") || has("user not found") {
        Some(PlatformError::UserNotParticipant)
    } else if has("message is not modified") {
        Some(PlatformError::MessageNotModified)
    } else if has("message can't be deleted") {
        Some(PlatformError::MessageDeleteForbidden)
    } else {
        None
    }
}

impl From<TelegramError> for PlatformError {
    fn from(err: TelegramError) -> Self {
        match err {
            TelegramError::Http(e) => PlatformError::Connection(e.to_string()),
            TelegramError::Timeout(d) => PlatformError::Timeout(d),
            TelegramError::Api { code, description } => classify(&description)
                .unwrap_or_else(|| PlatformError::Api(format!("{code}: {description}"))),
            TelegramError::RateLimited { retry_after } => PlatformError::RateLimited { retry_after },
            TelegramError::InvalidResponse(msg) => PlatformError::Serialization(msg),
        }
    }
}
