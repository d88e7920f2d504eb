use std::sync::Arc;
use std::time::Duration;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use stashlink_core::UserId;
use stashlink_store::Store;

use crate::error::ShortenerError;

/// URL shortened when validating new credentials.
pub const DEFAULT_PROBE_URL: &str = "https://www.google.com";

/// Configuration for the shortener HTTP client.
#[derive(Debug, Clone)]
pub struct ShortenerConfig {
    /// Scheme used to reach the shortener domain.
    pub scheme: String,
    pub request_timeout: Duration,
    pub probe_url: String,
}

impl Default for ShortenerConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_owned(),
            request_timeout: Duration::from_secs(10),
            probe_url: DEFAULT_PROBE_URL.to_owned(),
        }
    }
}

impl ShortenerConfig {
    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Response body of an adlinkfly-style `/api` endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShortenResponse {
    status: String,
    #[serde(default)]
    shortened_url: Option<String>,
    #[serde(default)]
    message: Option<ApiMessage>,
}

/// Shorteners report errors either as a string or a list of strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiMessage {
    One(String),
    Many(Vec<String>),
}

impl std::fmt::Display for ApiMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::One(m) => f.write_str(m),
            Self::Many(ms) => f.write_str(&ms.join("; ")),
        }
    }
}

/// Strip any scheme and trailing slashes from a user-entered domain.
pub fn normalize_domain(domain: &str) -> String {
    let trimmed = domain.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    without_scheme.trim_end_matches('/').to_owned()
}

/// Wraps URLs with an owner's configured shortener.
pub struct ShortenerAdapter {
    config: ShortenerConfig,
    client: Client,
    store: Arc<dyn Store>,
}

impl std::fmt::Debug for ShortenerAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShortenerAdapter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ShortenerAdapter {
    pub fn new(config: ShortenerConfig, store: Arc<dyn Store>) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("failed to build HTTP client");
        Self {
            config,
            client,
            store,
        }
    }

    /// Shorten `url` with `owner_id`'s shortener.
    ///
    /// Any failure returns `url` unchanged, so callers detect a fallback by
    /// comparing the result with the input.
    #[instrument(skip(self, url), fields(owner_id = %owner_id))]
    pub async fn shorten(&self, url: &str, owner_id: UserId) -> String {
        match self.try_shorten(url, owner_id).await {
            Ok(short) => short,
            Err(e) => {
                warn!(error = %e, "shortener failed, falling back to the original link");
                url.to_owned()
            }
        }
    }

    async fn try_shorten(&self, url: &str, owner_id: UserId) -> Result<String, ShortenerError> {
        let settings = self
            .store
            .get_user(owner_id)
            .await?
            .ok_or(ShortenerError::MissingCredentials)?;
        let (domain, api_key) = settings
            .shortener_credentials()
            .ok_or(ShortenerError::MissingCredentials)?;
        self.shorten_with(domain, api_key, url).await
    }

    /// Call `GET <scheme>://<domain>/api?api=<key>&url=<url>` directly.
    pub async fn shorten_with(
        &self,
        domain: &str,
        api_key: &str,
        url: &str,
    ) -> Result<String, ShortenerError> {
        let endpoint = format!(
            "{}://{}/api?api={}&url={}",
            self.config.scheme,
            normalize_domain(domain),
            utf8_percent_encode(api_key, NON_ALPHANUMERIC),
            utf8_percent_encode(url, NON_ALPHANUMERIC),
        );

        debug!(domain, "requesting short link");

        let response = self.client.get(&endpoint).send().await.map_err(|e| {
            if e.is_timeout() {
                ShortenerError::Timeout(self.config.request_timeout)
            } else {
                ShortenerError::Http(e.without_url())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShortenerError::Api(format!("HTTP {status}: {body}")));
        }

        let body: ShortenResponse = response
            .json()
            .await
            .map_err(|e| ShortenerError::InvalidResponse(e.without_url().to_string()))?;

        if body.status == "success"
            && let Some(short) = body.shortened_url.filter(|s| !s.is_empty())
        {
            return Ok(short);
        }
        Err(ShortenerError::Rejected(
            body.message.map_or(body.status, |m| m.to_string()),
        ))
    }

    /// Check that `domain` and `api_key` can shorten a probe URL.
    #[instrument(skip(self, api_key))]
    pub async fn validate(&self, domain: &str, api_key: &str) -> bool {
        match self
            .shorten_with(domain, api_key, &self.config.probe_url)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "shortener validation failed");
                false
            }
        }
    }
}
