use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters tracking link resolution and backup outcomes.
///
/// All counters use relaxed ordering. For a consistent point-in-time view,
/// call [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Deep-link payloads received.
    pub requests: AtomicU64,
    /// Files copied to a requester.
    pub delivered: AtomicU64,
    /// Links presented on the public path.
    pub links_issued: AtomicU64,
    /// Requests that ended in a rejection.
    pub rejected: AtomicU64,
    /// Shortener calls made on behalf of an owner.
    pub shortener_calls: AtomicU64,
    /// Shortener calls that fell back to the unshortened link.
    pub shortener_fallbacks: AtomicU64,
    /// New verification grants.
    pub verifications_granted: AtomicU64,
    /// Force-subscribe channels cleared because the bot lost access.
    pub fsub_self_heals: AtomicU64,
    /// Alerts sent to the admin.
    pub admin_alerts: AtomicU64,
    /// Files copied into the owner-db channel.
    pub files_ingested: AtomicU64,
    pub backups_started: AtomicU64,
    pub backups_completed: AtomicU64,
    pub backups_cancelled: AtomicU64,
    pub backups_failed: AtomicU64,
    /// Backup posts skipped after a send error.
    pub backup_items_skipped: AtomicU64,
    /// Prompts abandoned after the reply window elapsed.
    pub conversations_timed_out: AtomicU64,
}

impl EngineMetrics {
    pub fn increment_requests(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_links_issued(&self) {
        self.links_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_shortener_calls(&self) {
        self.shortener_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_shortener_fallbacks(&self) {
        self.shortener_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_verifications_granted(&self) {
        self.verifications_granted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_fsub_self_heals(&self) {
        self.fsub_self_heals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_admin_alerts(&self) {
        self.admin_alerts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_files_ingested(&self) {
        self.files_ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_backups_started(&self) {
        self.backups_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_backups_completed(&self) {
        self.backups_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_backups_cancelled(&self) {
        self.backups_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_backups_failed(&self) {
        self.backups_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_backup_items_skipped(&self) {
        self.backup_items_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_conversations_timed_out(&self) {
        self.conversations_timed_out.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            links_issued: self.links_issued.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            shortener_calls: self.shortener_calls.load(Ordering::Relaxed),
            shortener_fallbacks: self.shortener_fallbacks.load(Ordering::Relaxed),
            verifications_granted: self.verifications_granted.load(Ordering::Relaxed),
            fsub_self_heals: self.fsub_self_heals.load(Ordering::Relaxed),
            admin_alerts: self.admin_alerts.load(Ordering::Relaxed),
            files_ingested: self.files_ingested.load(Ordering::Relaxed),
            backups_started: self.backups_started.load(Ordering::Relaxed),
            backups_completed: self.backups_completed.load(Ordering::Relaxed),
            backups_cancelled: self.backups_cancelled.load(Ordering::Relaxed),
            backups_failed: self.backups_failed.load(Ordering::Relaxed),
            backup_items_skipped: self.backup_items_skipped.load(Ordering::Relaxed),
            conversations_timed_out: self.conversations_timed_out.load(Ordering::Relaxed),
        }
    }
}

/// A plain-data snapshot of [`EngineMetrics`] at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_field_names)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub delivered: u64,
    pub links_issued: u64,
    pub rejected: u64,
    pub shortener_calls: u64,
    pub shortener_fallbacks: u64,
    pub verifications_granted: u64,
    pub fsub_self_heals: u64,
    pub admin_alerts: u64,
    pub files_ingested: u64,
    pub backups_started: u64,
    pub backups_completed: u64,
    pub backups_cancelled: u64,
    pub backups_failed: u64,
    pub backup_items_skipped: u64,
    pub conversations_timed_out: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments() {
        let metrics = EngineMetrics::default();
        metrics.increment_requests();
        metrics.increment_requests();
        metrics.increment_delivered();
        metrics.increment_backup_items_skipped();

        let snap = metrics.snapshot();
        assert_eq!(snap.requests, 2);
        assert_eq!(snap.delivered, 1);
        assert_eq!(snap.backup_items_skipped, 1);
        assert_eq!(snap.rejected, 0);
    }
}
