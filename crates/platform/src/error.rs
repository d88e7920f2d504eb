use std::time::Duration;

use thiserror::Error;

/// Errors returned by a messaging platform client.
///
/// Conditions the bot reacts to individually get their own variant; anything
/// else lands in [`PlatformError::Api`].
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The recipient blocked the bot.
    #[error("user blocked the bot")]
    UserBlocked,

    #[error("chat not found")]
    ChatNotFound,

    #[error("channel is private")]
    ChannelPrivate,

    #[error("channel is invalid")]
    ChannelInvalid,

    #[error("peer id is invalid")]
    PeerIdInvalid,

    /// The bot lacks admin rights required for the call.
    #[error("admin rights required")]
    AdminRequired,

    #[error("user is not a participant")]
    UserNotParticipant,

    #[error("message is not modified")]
    MessageNotModified,

    #[error("message cannot be deleted")]
    MessageDeleteForbidden,

    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    /// Any other error reported by the platform API.
    #[error("API error: {0}")]
    Api(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl PlatformError {
    /// Returns `true` if the error is transient and the call may succeed on
    /// retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Connection(_) | Self::RateLimited { .. }
        )
    }

    /// Returns `true` if the target channel can no longer be used by the bot:
    /// it is gone, private, unknown, or the bot lost its rights there.
    pub fn is_channel_unusable(&self) -> bool {
        matches!(
            self,
            Self::ChatNotFound
                | Self::ChannelPrivate
                | Self::ChannelInvalid
                | Self::PeerIdInvalid
                | Self::AdminRequired
                | Self::UserNotParticipant
        )
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::UserBlocked)
    }
}
