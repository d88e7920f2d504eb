use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// Length of a verification window in time-boxed shortener mode.
pub const VERIFICATION_WINDOW_HOURS: i64 = 12;

/// The standard verification window as a duration.
#[must_use]
pub fn verification_window() -> Duration {
    Duration::hours(VERIFICATION_WINDOW_HOURS)
}

/// A time-boxed bypass of per-request shortening for one requester and one
/// owner. Expiry is evaluated at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationGrant {
    pub requester_id: UserId,
    pub owner_id: UserId,
    /// File whose `finalget` link produced the grant.
    pub file_unique_id: String,
    pub granted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl VerificationGrant {
    #[must_use]
    pub fn new(
        requester_id: UserId,
        owner_id: UserId,
        file_unique_id: impl Into<String>,
        granted_at: DateTime<Utc>,
        window: Duration,
    ) -> Self {
        Self {
            requester_id,
            owner_id,
            file_unique_id: file_unique_id.into(),
            granted_at,
            expires_at: granted_at + window,
        }
    }

    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
