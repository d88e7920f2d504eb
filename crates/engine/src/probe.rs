//! Reachability checks for links owners paste into settings.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// Default time allowed for a link check.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// The link answered with a 2xx or 3xx status.
    Reachable,
    /// The link answered with an error status or could not be reached.
    Unreachable,
    /// No answer within the timeout.
    TimedOut,
}

/// Checks whether a URL answers.
#[async_trait]
pub trait UrlProbe: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeResult;
}

/// [`UrlProbe`] issuing a `HEAD` request without following redirects.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("failed to build HTTP client");
        Self { client }
    }
}

#[async_trait]
impl UrlProbe for HttpProbe {
    async fn probe(&self, url: &str) -> ProbeResult {
        match self.client.head(url).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() || status.is_redirection() {
                    ProbeResult::Reachable
                } else {
                    debug!(%status, "link answered with an error status");
                    ProbeResult::Unreachable
                }
            }
            Err(e) if e.is_timeout() => ProbeResult::TimedOut,
            Err(e) => {
                debug!(error = %e.without_url(), "link check failed");
                ProbeResult::Unreachable
            }
        }
    }
}

/// Prefix `https://` when the user left out the scheme.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_owned()
    } else {
        format!("https://{trimmed}")
    }
}
