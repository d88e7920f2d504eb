//! Time-boxed verification grants and view bookkeeping.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use stashlink_core::{UserId, verification_window};
use stashlink_store::{Store, StoreError};

/// Result of [`VerificationLedger::claim`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    /// A new grant was written by this call.
    pub newly_granted: bool,
    /// The requester already held an active grant before the call.
    pub was_verified: bool,
}

impl Claim {
    /// Whether the requester should be told their verification succeeded.
    pub fn should_announce(self) -> bool {
        self.newly_granted && !self.was_verified
    }
}

#[derive(Clone)]
pub struct VerificationLedger {
    store: Arc<dyn Store>,
    window: Duration,
}

impl std::fmt::Debug for VerificationLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationLedger")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl VerificationLedger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_window(store, verification_window())
    }

    pub fn with_window(store: Arc<dyn Store>, window: Duration) -> Self {
        Self { store, window }
    }

    pub async fn is_verified(&self, requester: UserId, owner_id: UserId) -> Result<bool, StoreError> {
        self.is_verified_at(requester, owner_id, Utc::now()).await
    }

    pub async fn is_verified_at(
        &self,
        requester: UserId,
        owner_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.store.is_user_verified(requester, owner_id, now).await
    }

    pub async fn claim(
        &self,
        owner_id: UserId,
        file_unique_id: &str,
        requester: UserId,
    ) -> Result<Claim, StoreError> {
        self.claim_at(owner_id, file_unique_id, requester, Utc::now())
            .await
    }

    /// Grant `requester` a window for `owner_id` unless one is active, and
    /// record one view either way.
    ///
    /// A failed view write is logged and does not fail the claim.
    pub async fn claim_at(
        &self,
        owner_id: UserId,
        file_unique_id: &str,
        requester: UserId,
        now: DateTime<Utc>,
    ) -> Result<Claim, StoreError> {
        let was_verified = self.store.is_user_verified(requester, owner_id, now).await?;
        let newly_granted = self
            .store
            .claim_verification_for_file(owner_id, file_unique_id, requester, now, self.window)
            .await?;
        if let Err(e) = self.store.record_daily_view(owner_id, requester, now).await {
            warn!(error = %e, owner_id = %owner_id, "failed to record view");
        }
        Ok(Claim {
            newly_granted,
            was_verified,
        })
    }
}
