use std::time::Duration;

use thiserror::Error;

/// Errors from a shortener call. Callers of
/// [`ShortenerAdapter::shorten`](crate::ShortenerAdapter::shorten) never see
/// these; they fall back to the unshortened URL.
#[derive(Debug, Error)]
pub enum ShortenerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("shortener timed out after {0:?}")]
    Timeout(Duration),

    /// The shortener answered with a non-2xx status.
    #[error("shortener API error: {0}")]
    Api(String),

    /// The body was not the expected JSON shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The shortener answered but refused to shorten.
    #[error("shortener rejected the request: {0}")]
    Rejected(String),

    #[error("no shortener configured for owner")]
    MissingCredentials,

    #[error("store error: {0}")]
    Store(#[from] stashlink_store::StoreError),
}
