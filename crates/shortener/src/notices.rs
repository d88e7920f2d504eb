use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;

use stashlink_core::UserId;

/// Minimum gap between two "shortener unavailable" notices to one requester.
pub const NOTICE_INTERVAL: Duration = Duration::from_secs(3600);

/// Remembers when each requester was last told the shortener is down.
#[derive(Debug)]
pub struct ShortenerNotices {
    last_notified: DashMap<UserId, Instant>,
    interval: Duration,
}

impl Default for ShortenerNotices {
    fn default() -> Self {
        Self::new(NOTICE_INTERVAL)
    }
}

impl ShortenerNotices {
    pub fn new(interval: Duration) -> Self {
        Self {
            last_notified: DashMap::new(),
            interval,
        }
    }

    /// Returns `true` and records the time if `requester` has not been
    /// notified within the interval. Concurrent calls for the same requester
    /// yield at most one `true`.
    pub fn should_notify(&self, requester: UserId) -> bool {
        let now = Instant::now();
        match self.last_notified.entry(requester) {
            Entry::Occupied(mut last) => {
                if now.duration_since(*last.get()) > self.interval {
                    last.insert(now);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
        }
    }

    /// Forget requesters whose last notice is older than the interval.
    pub fn prune(&self) {
        let now = Instant::now();
        self.last_notified
            .retain(|_, last| now.duration_since(*last) <= self.interval);
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn len(&self) -> usize {
        self.last_notified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_notified.is_empty()
    }
}
