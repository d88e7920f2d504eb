use serde::{Deserialize, Serialize};

use crate::button::FooterButton;
use crate::types::{ChatId, UserId};

/// How an owner's shortener gates public requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortenerMode {
    /// Every public request goes through the shortener.
    #[default]
    EachTime,
    /// One shortener pass grants a 12 hour verification window.
    #[serde(alias = "12_hour")]
    TwelveHour,
}

impl ShortenerMode {
    /// The other mode, used by the settings toggle.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::EachTime => Self::TwelveHour,
            Self::TwelveHour => Self::EachTime,
        }
    }
}

/// Per-owner configuration read by the delivery pipeline.
///
/// Mutated only through settings conversations; the delivery pipeline treats
/// it as read-only except for the fsub self-heal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerSettings {
    pub user_id: UserId,
    #[serde(default = "default_true")]
    pub shortener_enabled: bool,
    #[serde(default)]
    pub shortener_mode: ShortenerMode,
    #[serde(default)]
    pub shortener_url: Option<String>,
    #[serde(default)]
    pub shortener_api: Option<String>,
    #[serde(default)]
    pub fsub_channel: Option<ChatId>,
    #[serde(default)]
    pub filename_url: Option<String>,
    #[serde(default)]
    pub how_to_download_link: Option<String>,
    #[serde(default)]
    pub post_channels: Vec<ChatId>,
    #[serde(default)]
    pub footer_buttons: Vec<FooterButton>,
}

fn default_true() -> bool {
    true
}

impl OwnerSettings {
    /// Settings for a freshly registered user.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            shortener_enabled: true,
            shortener_mode: ShortenerMode::default(),
            shortener_url: None,
            shortener_api: None,
            fsub_channel: None,
            filename_url: None,
            how_to_download_link: None,
            post_channels: Vec::new(),
            footer_buttons: Vec::new(),
        }
    }

    /// Shortener domain and API key, if both are configured.
    #[must_use]
    pub fn shortener_credentials(&self) -> Option<(&str, &str)> {
        match (self.shortener_url.as_deref(), self.shortener_api.as_deref()) {
            (Some(domain), Some(key)) if !domain.is_empty() && !key.is_empty() => {
                Some((domain, key))
            }
            _ => None,
        }
    }
}

/// A single-field update applied through the store's `update_user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum SettingsUpdate {
    ShortenerEnabled(bool),
    ShortenerMode(ShortenerMode),
    Shortener { domain: String, api_key: String },
    FsubChannel(Option<ChatId>),
    FilenameUrl(Option<String>),
    HowToDownloadLink(Option<String>),
    AddPostChannel(ChatId),
    RemovePostChannel(ChatId),
    AddFooterButton(FooterButton),
}

impl SettingsUpdate {
    /// Apply the update to an in-memory settings record.
    pub fn apply(self, settings: &mut OwnerSettings) {
        match self {
            Self::ShortenerEnabled(v) => settings.shortener_enabled = v,
            Self::ShortenerMode(m) => settings.shortener_mode = m,
            Self::Shortener { domain, api_key } => {
                settings.shortener_url = Some(domain);
                settings.shortener_api = Some(api_key);
            }
            Self::FsubChannel(c) => settings.fsub_channel = c,
            Self::FilenameUrl(u) => settings.filename_url = u,
            Self::HowToDownloadLink(u) => settings.how_to_download_link = u,
            Self::AddPostChannel(c) => {
                if !settings.post_channels.contains(&c) {
                    settings.post_channels.push(c);
                }
            }
            Self::RemovePostChannel(c) => settings.post_channels.retain(|x| *x != c),
            Self::AddFooterButton(b) => settings.footer_buttons.push(b),
        }
    }
}
