use serde::{Deserialize, Serialize};

use crate::button::ButtonLayout;
use crate::link::FilePayload;
use crate::types::{ChatId, MessageId, UserId};

/// A file stored in the owner-db channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub owner_id: UserId,
    pub file_unique_id: String,
    pub file_name: String,
    /// Message id of the stored copy inside the owner-db channel.
    pub file_id: MessageId,
    /// Identifier the streaming server resolves for `/download/`.
    pub stream_id: MessageId,
}

impl FileRecord {
    #[must_use]
    pub fn payload(&self) -> FilePayload {
        FilePayload::new(self.owner_id, self.file_unique_id.clone())
    }
}

/// A post previously published to one of an owner's channels, kept so it can
/// be mirrored elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupPost {
    pub owner_id: UserId,
    pub channel_id: ChatId,
    pub caption: String,
    /// Photo file id or URL shown above the caption.
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub reply_markup: Option<ButtonLayout>,
}
