use serde::Deserialize;

use stashlink_core::{ChatId, LinkConfig, UserId};

/// Where fast-download links point and who administers the bot.
#[derive(Debug, Clone, Deserialize)]
pub struct LinksConfig {
    /// Public address of the streaming host.
    #[serde(default = "default_vps_ip")]
    pub vps_ip: String,
    #[serde(default = "default_vps_port")]
    pub vps_port: u16,
    /// Receives storage alerts. `0` means unset.
    #[serde(default)]
    pub admin_id: i64,
    /// Channel every upload is copied into.
    #[serde(default)]
    pub owner_db_channel: Option<i64>,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            vps_ip: default_vps_ip(),
            vps_port: default_vps_port(),
            admin_id: 0,
            owner_db_channel: None,
        }
    }
}

impl LinksConfig {
    /// Freeze into the engine's link configuration.
    pub fn to_link_config(&self, bot_username: &str) -> LinkConfig {
        LinkConfig {
            vps_ip: self.vps_ip.clone(),
            vps_port: self.vps_port,
            bot_username: bot_username.trim_start_matches('@').to_owned(),
            admin_id: UserId::new(self.admin_id),
            owner_db_channel: self.owner_db_channel.map(ChatId::new),
        }
    }
}

fn default_vps_ip() -> String {
    "127.0.0.1".to_owned()
}

fn default_vps_port() -> u16 {
    8080
}
