use thiserror::Error;

/// Errors that can occur while resolving links or running background jobs.
///
/// Requesters never see these directly; the router answers any error with a
/// generic apology and logs the detail.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An error occurred in the store.
    #[error("store error: {0}")]
    Store(#[from] stashlink_store::StoreError),

    /// A platform call failed in a way the pipeline does not handle itself.
    #[error("platform error: {0}")]
    Platform(#[from] stashlink_platform::PlatformError),

    /// The engine was misconfigured (e.g. missing required components).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The dispatch table is incomplete or ambiguous.
    #[error("routing error: {0}")]
    Routing(String),
}

impl EngineError {
    /// Returns `true` if the error is transient and the request may succeed
    /// if the user tries again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Platform(e) => e.is_retryable(),
            Self::Store(stashlink_store::StoreError::Timeout(_)) => true,
            _ => false,
        }
    }
}
