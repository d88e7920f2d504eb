use std::time::Duration;

use stashlink_shortener::NOTICE_INTERVAL;

use crate::probe::DEFAULT_PROBE_TIMEOUT;

/// Tunables for the engine. Defaults match production behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Pause between two posts sent by a backup run.
    pub backup_delay: Duration,
    /// Edit the backup status message after this many posts.
    pub backup_progress_every: usize,
    /// Time allowed for a pasted link to answer.
    pub probe_timeout: Duration,
    /// Minimum gap between "shortener unavailable" notices to one requester.
    pub notice_interval: Duration,
    /// Appended to every delivered file's caption.
    pub caption_suffix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backup_delay: Duration::from_secs(2),
            backup_progress_every: 10,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            notice_interval: NOTICE_INTERVAL,
            caption_suffix: String::new(),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_backup_delay(mut self, delay: Duration) -> Self {
        self.backup_delay = delay;
        self
    }

    #[must_use]
    pub fn with_backup_progress_every(mut self, every: usize) -> Self {
        self.backup_progress_every = every.max(1);
        self
    }

    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_notice_interval(mut self, interval: Duration) -> Self {
        self.notice_interval = interval;
        self
    }

    #[must_use]
    pub fn with_caption_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.caption_suffix = suffix.into();
        self
    }
}
