use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use stashlink_shortener::ShortenerNotices;

use crate::backup::BackupRegistry;

/// Process-wide mutable state shared by every update handler.
///
/// Created once at start-up. Background work (backup runs, prompt timers) is
/// spawned through the coordinator so [`shutdown`](Self::shutdown) can wait
/// for it.
#[derive(Debug)]
pub struct Coordinator {
    backups: BackupRegistry,
    notices: Arc<ShortenerNotices>,
    tasks: TaskTracker,
    shutdown: CancellationToken,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(stashlink_shortener::NOTICE_INTERVAL)
    }
}

impl Coordinator {
    pub fn new(notice_interval: Duration) -> Self {
        Self {
            backups: BackupRegistry::new(),
            notices: Arc::new(ShortenerNotices::new(notice_interval)),
            tasks: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn backups(&self) -> &BackupRegistry {
        &self.backups
    }

    pub fn notices(&self) -> &ShortenerNotices {
        &self.notices
    }

    /// Forget stale shortener notices once per notice interval until
    /// shutdown.
    pub fn start_notice_pruning(&self) {
        let notices = Arc::clone(&self.notices);
        let shutdown = self.shutdown.clone();
        let every = notices.interval().max(Duration::from_secs(1));
        self.spawn(async move {
            let mut ticks = tokio::time::interval(every);
            ticks.tick().await;
            loop {
                tokio::select! {
                    _ = ticks.tick() => {
                        notices.prune();
                        debug!(remaining = notices.len(), "pruned shortener notices");
                    }
                    () = shutdown.cancelled() => break,
                }
            }
        });
    }

    /// Token cancelled when shutdown begins. Long sleeps select on it.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Spawn a tracked background task.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(task);
    }

    /// Number of background tasks still running.
    pub fn active_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Cancel running backups and pending timers, then wait for every
    /// tracked task to finish.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.backups.cancel_all();
        self.tasks.close();
        self.tasks.wait().await;
        info!("coordinator shutdown complete");
    }
}
