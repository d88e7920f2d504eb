use serde::{Deserialize, Serialize};

use crate::link::{DeepLinkRequest, deep_link_url};
use crate::types::{ChatId, MessageId, UserId};

/// Process-wide link configuration, read once at start-up.
///
/// Every fast-download URL is built from this value so links always reflect
/// the current host and port, never what was current when a file was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    pub vps_ip: String,
    pub vps_port: u16,
    pub bot_username: String,
    pub admin_id: UserId,
    pub owner_db_channel: Option<ChatId>,
}

impl LinkConfig {
    fn base(&self) -> String {
        format!("http://{}:{}", self.vps_ip, self.vps_port)
    }

    /// `http://<ip>:<port>/download/<stream_id>`
    #[must_use]
    pub fn download_url(&self, stream_id: MessageId) -> String {
        format!("{}/download/{stream_id}", self.base())
    }

    /// `http://<ip>:<port>/get/<owner>_<file_unique_id>`
    #[must_use]
    pub fn get_url(&self, owner_id: UserId, file_unique_id: &str) -> String {
        format!("{}/get/{owner_id}_{file_unique_id}", self.base())
    }

    /// `https://t.me/<bot>?start=<payload>`
    #[must_use]
    pub fn deep_link(&self, request: &DeepLinkRequest) -> String {
        deep_link_url(&self.bot_username, request)
    }
}
