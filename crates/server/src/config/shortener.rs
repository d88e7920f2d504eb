use std::time::Duration;

use serde::Deserialize;

use stashlink_shortener::ShortenerConfig;

/// Shortener HTTP client settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ShortenerSection {
    /// Scheme used to reach owner-configured shortener domains.
    #[serde(default = "default_scheme")]
    pub scheme: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ShortenerSection {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl ShortenerSection {
    pub fn to_shortener_config(&self) -> ShortenerConfig {
        ShortenerConfig::default()
            .with_scheme(self.scheme.clone())
            .with_request_timeout(Duration::from_secs(self.timeout_seconds))
    }
}

fn default_scheme() -> String {
    "https".to_owned()
}

fn default_timeout() -> u64 {
    10
}
