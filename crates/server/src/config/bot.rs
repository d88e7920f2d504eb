use std::time::Duration;

use serde::Deserialize;

use stashlink_telegram::TelegramConfig;
use stashlink_telegram::config::DEFAULT_API_BASE_URL;

/// Bot API credentials and long-polling settings.
#[derive(Clone, Deserialize)]
pub struct BotConfig {
    /// Token issued by `@BotFather`. Usually supplied via
    /// `STASHLINK_BOT_TOKEN` rather than the file.
    #[serde(default)]
    pub token: String,
    /// Username used in deep links. Looked up with `getMe` when unset.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Long-poll timeout passed to `getUpdates`.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_seconds: u32,
    /// Per-request HTTP timeout. Must exceed the poll timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Pause after a failed `getUpdates` call.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: u64,
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"[REDACTED]")
            .field("username", &self.username)
            .field("api_base_url", &self.api_base_url)
            .field("poll_timeout_seconds", &self.poll_timeout_seconds)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("retry_delay_seconds", &self.retry_delay_seconds)
            .finish()
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            username: None,
            api_base_url: default_api_base_url(),
            poll_timeout_seconds: default_poll_timeout(),
            request_timeout_seconds: default_request_timeout(),
            retry_delay_seconds: default_retry_delay(),
        }
    }
}

impl BotConfig {
    pub fn telegram(&self) -> TelegramConfig {
        TelegramConfig::new(self.token.clone())
            .with_api_base_url(self.api_base_url.clone())
            .with_request_timeout(Duration::from_secs(self.request_timeout_seconds))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_seconds)
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_owned()
}

fn default_poll_timeout() -> u32 {
    30
}

fn default_request_timeout() -> u64 {
    60
}

fn default_retry_delay() -> u64 {
    5
}
