use std::time::Duration;

use serde::Deserialize;

use stashlink_engine::EngineConfig;

/// Delivery and backup tunables.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// Pause between two posts of a backup run, in milliseconds.
    #[serde(default = "default_backup_delay")]
    pub backup_delay_ms: u64,
    /// Edit the backup status message every this many posts.
    #[serde(default = "default_backup_progress_every")]
    pub backup_progress_every: usize,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_seconds: u64,
    /// Minimum gap between two "shortener unavailable" notices to one user.
    #[serde(default = "default_notice_interval")]
    pub notice_interval_seconds: u64,
    /// Appended to every delivered caption.
    #[serde(default)]
    pub caption_suffix: String,
    /// Maximum wait for in-flight handlers and backups on shutdown.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            backup_delay_ms: default_backup_delay(),
            backup_progress_every: default_backup_progress_every(),
            probe_timeout_seconds: default_probe_timeout(),
            notice_interval_seconds: default_notice_interval(),
            caption_suffix: String::new(),
            shutdown_timeout_seconds: default_shutdown_timeout(),
        }
    }
}

impl EngineSection {
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_backup_delay(Duration::from_millis(self.backup_delay_ms))
            .with_backup_progress_every(self.backup_progress_every.max(1))
            .with_probe_timeout(Duration::from_secs(self.probe_timeout_seconds))
            .with_notice_interval(Duration::from_secs(self.notice_interval_seconds))
            .with_caption_suffix(self.caption_suffix.clone())
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }
}

fn default_backup_delay() -> u64 {
    2000
}

fn default_backup_progress_every() -> usize {
    10
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_notice_interval() -> u64 {
    3600
}

fn default_shutdown_timeout() -> u64 {
    30
}
