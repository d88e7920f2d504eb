use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ChatId, UserId};

/// How long a prompt waits for the user's next message.
pub const PROMPT_TIMEOUT_SECS: i64 = 300;

/// Which reply a user's open prompt is waiting for.
///
/// Steps that collect more than one value carry the values gathered so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ConversationState {
    /// A message forwarded from the channel to use for force-subscribe.
    FsubChannel,
    /// A message forwarded from a channel the owner posts to.
    PostChannel,
    FilenameLink,
    HowToDownload,
    ShortenerDomain,
    ShortenerApiKey { domain: String },
    FooterText,
    FooterUrl { text: String },
    /// A press on one of the offered backup source buttons.
    BackupSource,
    /// A message forwarded from the backup destination channel.
    BackupDestination { source: ChatId },
}

impl ConversationState {
    /// Prompt text sent when entering this step.
    #[must_use]
    pub const fn prompt(&self) -> &'static str {
        match self {
            Self::FsubChannel => {
                "Forward a message from the channel you want to use for force-subscribe.\n\nThe bot must be an admin there."
            }
            Self::PostChannel => {
                "Forward a message from the channel you want to add.\n\nThe bot must be an admin there."
            }
            Self::FilenameLink => "Send the link the file name should point to.",
            Self::HowToDownload => "Send the \"How to Download\" tutorial link.",
            Self::ShortenerDomain => "Send your shortener domain (e.g. `shortener.example`).",
            Self::ShortenerApiKey { .. } => "Now send your shortener API key.",
            Self::FooterText => "Send the button text (max 50 bytes).",
            Self::FooterUrl { .. } => "Now send the button URL.",
            Self::BackupSource => "Choose the channel to back up:",
            Self::BackupDestination { .. } => {
                "Forward a message from the channel you want to back up to.\n\nThe bot must be an admin there."
            }
        }
    }
}

/// An open prompt, persisted so an interrupted process can tell the user it
/// was cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub user_id: UserId,
    pub state: ConversationState,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Conversation {
    /// Open a conversation at `now` with the standard prompt timeout.
    #[must_use]
    pub fn open(user_id: UserId, state: ConversationState, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            state,
            started_at: now,
            expires_at: now + Duration::seconds(PROMPT_TIMEOUT_SECS),
        }
    }

    /// Move to the next step, restarting the timeout.
    #[must_use]
    pub fn advance(self, state: ConversationState, now: DateTime<Utc>) -> Self {
        Self::open(self.user_id, state, now)
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
