use serde::{Deserialize, Serialize};

/// Every way a request can fail that the requester or owner gets told about.
///
/// Raw platform and store errors are converted into one of these at the edge
/// of each engine operation and never shown verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MalformedPayload,
    NotOwner,
    FileGone,
    NeedsJoin,
    /// The owner's force-subscribe channel is unusable; cleared automatically.
    ChannelGone,
    /// The requester blocked the bot. Logged and swallowed.
    RecipientBlocked,
    /// The owner-db channel cannot be read. The admin is alerted.
    InvalidRecipientChannel,
    ShortenerUnavailable,
    PromptTimeout,
    ValidationTimeout,
}

impl FailureKind {
    /// Non-technical message shown to the affected user.
    #[must_use]
    pub const fn user_message(self) -> &'static str {
        match self {
            Self::MalformedPayload => "The link is invalid or corrupted.",
            Self::NotOwner => "This is a special link for the file owner only.",
            Self::FileGone => "File not found or link has expired.",
            Self::NeedsJoin => "You must join the channel to continue.",
            Self::ChannelGone => {
                "This link is temporarily unavailable. Please tap Retry in a moment."
            }
            Self::RecipientBlocked => "Could not reach you because you have blocked the bot.",
            Self::InvalidRecipientChannel => {
                "Sorry, the bot is facing a configuration issue and cannot retrieve files right now. The admin has been notified."
            }
            Self::ShortenerUnavailable => {
                "⚠️ **Shortener Unavailable!**\n\nThe owner's link shortener is currently unavailable. A direct link has been provided instead. Please check your shortener settings if this persists."
            }
            Self::PromptTimeout => "❗️ **Timeout:** Cancelled.",
            Self::ValidationTimeout => {
                "❌ The link could not be verified in time. Please check it and try again."
            }
        }
    }

    /// Whether the failure is silent towards the requester.
    #[must_use]
    pub const fn is_silent(self) -> bool {
        matches!(self, Self::RecipientBlocked)
    }
}
