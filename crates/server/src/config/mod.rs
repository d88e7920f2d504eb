mod bot;
mod engine;
mod links;
mod shortener;


pub use bot::*;
pub use engine::*;
pub use links::*;
pub use shortener::*;

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ServerError;

/// Top-level configuration for the stashlink bot, loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct StashlinkConfig {
    /// Bot API credentials and polling.
    #[serde(default)]
    pub bot: BotConfig,
    /// Host, port, admin, and storage channel used to build links.
    #[serde(default)]
    pub links: LinksConfig,
    /// Delivery and backup tunables.
    #[serde(default)]
    pub engine: EngineSection,
    /// Shortener HTTP client.
    #[serde(default)]
    pub shortener: ShortenerSection,
}

impl StashlinkConfig {
    /// Read the TOML file at `path`, or fall back to defaults when it does
    /// not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServerError> {
        let path = path.as_ref();
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            Ok(toml::from_str("")?)
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ServerError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    ///
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(token) = get("STASHLINK_BOT_TOKEN") {
            self.bot.token = token;
        }
        if let Some(ip) = get("VPS_IP") {
            self.links.vps_ip = ip;
        }
        if let Some(port) = get("VPS_PORT") {
            self.links.vps_port = parse_var("VPS_PORT", &port)?;
        }
        if let Some(admin) = get("ADMIN_ID") {
            self.links.admin_id = parse_var("ADMIN_ID", &admin)?;
        }
        if let Some(channel) = get("OWNER_DB_CHANNEL") {
            self.links.owner_db_channel = Some(parse_var("OWNER_DB_CHANNEL", &channel)?);
        }
        Ok(())
    }

    /// Reject configurations the bot cannot start with.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.bot.token.trim().is_empty() {
            return Err(ServerError::Config(
                "bot token is required (bot.token or STASHLINK_BOT_TOKEN)".into(),
            ));
        }
        if self.links.admin_id == 0 {
            return Err(ServerError::Config(
                "admin id is required (links.admin_id or ADMIN_ID)".into(),
            ));
        }
        if self.links.vps_ip.trim().is_empty() {
            return Err(ServerError::Config("links.vps_ip must not be empty".into()));
        }
        if self.bot.request_timeout_seconds <= u64::from(self.bot.poll_timeout_seconds) {
            return Err(ServerError::Config(format!(
                "bot.request_timeout_seconds ({}) must exceed bot.poll_timeout_seconds ({})",
                self.bot.request_timeout_seconds, self.bot.poll_timeout_seconds
            )));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T, ServerError> {
    value
        .trim()
        .parse()
        .map_err(|_| ServerError::Config(format!("{key} is not valid: {value:?}")))
}
