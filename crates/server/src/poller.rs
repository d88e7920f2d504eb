use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use stashlink_platform::{DynPlatform, PlatformError, Update};

/// Long-polls the Bot API and hands every update to a dispatcher.
///
/// The offset always moves past the highest update id seen, so an update
/// is dispatched at most once per process.
pub struct Poller {
    platform: Arc<dyn DynPlatform>,
    timeout_secs: u32,
    retry_delay: Duration,
    offset: i64,
}

impl Poller {
    pub fn new(platform: Arc<dyn DynPlatform>, timeout_secs: u32, retry_delay: Duration) -> Self {
        Self {
            platform,
            timeout_secs,
            retry_delay,
            offset: 0,
        }
    }

    /// Next update id to ask for.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Fetch one batch and advance the offset past it.
    pub async fn next_batch(&mut self) -> Result<Vec<Update>, PlatformError> {
        let updates = self
            .platform
            .get_updates(self.offset, self.timeout_secs)
            .await?;
        if let Some(last) = updates.iter().map(|u| u.update_id).max() {
            self.offset = self.offset.max(last + 1);
        }
        Ok(updates)
    }

    /// Poll until `shutdown` resolves. `dispatch` must not block; it is
    /// expected to spawn the actual handling.
    pub async fn run<S, F>(mut self, shutdown: S, mut dispatch: F)
    where
        S: Future<Output = ()>,
        F: FnMut(Update),
    {
        let retry_delay = self.retry_delay;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                batch = self.next_batch() => match batch {
                    Ok(updates) => {
                        if !updates.is_empty() {
                            debug!(count = updates.len(), offset = self.offset, "received updates");
                        }
                        for update in updates {
                            dispatch(update);
                        }
                    }
                    Err(e) => {
                        let delay = match &e {
                            PlatformError::RateLimited { retry_after: Some(after) } => *after,
                            _ => retry_delay,
                        };
                        warn!(
                            error = %e,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            "getUpdates failed, retrying"
                        );
                        tokio::select! {
                            () = &mut shutdown => break,
                            () = tokio::time::sleep(delay) => {}
                        }
                    }
                },
            }
        }

        info!(offset = self.offset, "poller stopped");
    }
}
