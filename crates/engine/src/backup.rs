//! Re-posting a channel's saved posts into another channel.
//!
//! A run moves through `Selecting(source) → Selecting(destination) →
//! Running → {Completed, Cancelled, Failed}`. The two selection steps are
//! ordinary prompts; [`BackupRegistry`] guarantees at most one running job
//! per user.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, error, info, instrument, warn};

use stashlink_core::{
    BackupPost, Button, ButtonAction, ButtonLayout, ChatId, Conversation, ConversationState,
    FailureKind, MessageId, UserId,
};
use stashlink_platform::{PlatformError, SendOptions};

use crate::caption::rewrite_get_links;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::messages;
use crate::routing::{BACKUP_SOURCE_PREFIX, CANCEL_BACKUP_PREFIX};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupJob {
    pub user_id: UserId,
    pub source: ChatId,
    pub destination: ChatId,
}

#[derive(Debug)]
struct Slot {
    job: BackupJob,
    generation: u64,
    cancelled: Arc<AtomicBool>,
}

/// The set of users with a backup in progress.
#[derive(Debug, Clone, Default)]
pub struct BackupRegistry {
    running: Arc<DashMap<UserId, Slot>>,
    generations: Arc<AtomicU64>,
}

impl BackupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the user's slot. Returns `None`, leaving the existing job
    /// untouched, when one is already held.
    pub fn try_acquire(&self, job: BackupJob) -> Option<BackupTicket> {
        match self.running.entry(job.user_id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(vacant) => {
                let generation = self.generations.fetch_add(1, Ordering::Relaxed);
                let cancelled = Arc::new(AtomicBool::new(false));
                vacant.insert(Slot {
                    job: job.clone(),
                    generation,
                    cancelled: Arc::clone(&cancelled),
                });
                Some(BackupTicket {
                    running: Arc::clone(&self.running),
                    job,
                    generation,
                    cancelled,
                })
            }
        }
    }

    /// Ask the user's running job to stop before its next post.
    /// Returns `false` when no job is running.
    pub fn cancel(&self, user_id: UserId) -> bool {
        self.running.get(&user_id).is_some_and(|slot| {
            slot.cancelled.store(true, Ordering::Release);
            true
        })
    }

    pub fn cancel_all(&self) {
        for slot in self.running.iter() {
            slot.cancelled.store(true, Ordering::Release);
        }
    }

    pub fn is_running(&self, user_id: UserId) -> bool {
        self.running.contains_key(&user_id)
    }

    /// The user's current job, if any.
    pub fn job(&self, user_id: UserId) -> Option<BackupJob> {
        self.running.get(&user_id).map(|slot| slot.job.clone())
    }

    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }
}

/// Proof of a held slot. Dropping it releases the slot.
#[derive(Debug)]
pub struct BackupTicket {
    running: Arc<DashMap<UserId, Slot>>,
    job: BackupJob,
    generation: u64,
    cancelled: Arc<AtomicBool>,
}

impl BackupTicket {
    pub fn job(&self) -> &BackupJob {
        &self.job
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for BackupTicket {
    fn drop(&mut self) {
        let generation = self.generation;
        self.running
            .remove_if(&self.job.user_id, |_, slot| slot.generation == generation);
    }
}

/// Point URL buttons carrying `get` links at the new owner.
fn rewrite_markup(layout: &ButtonLayout, engine: &Engine, owner: UserId) -> ButtonLayout {
    let rows = layout
        .inline_keyboard
        .iter()
        .map(|row| {
            row.iter()
                .map(|button| match &button.action {
                    ButtonAction::Url(url) => Button::url(
                        button.text.clone(),
                        rewrite_get_links(url, owner, &engine.links),
                    ),
                    ButtonAction::Callback(_) => button.clone(),
                })
                .collect()
        })
        .collect();
    ButtonLayout {
        inline_keyboard: rows,
    }
}

impl Engine {
    /// Offer the user's post channels as backup sources. The offer is a
    /// prompt and times out like one.
    pub async fn begin_backup(&self, user: UserId, now: DateTime<Utc>) -> Result<(), EngineError> {
        let chat = ChatId::from(user);
        if self.coordinator.backups().is_running(user) {
            self.send(chat, messages::BACKUP_ALREADY_RUNNING, &SendOptions::new())
                .await?;
            return Ok(());
        }

        let channels = self
            .store
            .get_user(user)
            .await?
            .map(|s| s.post_channels)
            .unwrap_or_default();
        if channels.is_empty() {
            self.send(chat, messages::BACKUP_NO_CHANNELS, &SendOptions::new())
                .await?;
            return Ok(());
        }

        let mut layout = ButtonLayout::new();
        for channel in channels {
            layout.push_row(vec![Button::callback(
                format!("📢 {channel}"),
                format!("{BACKUP_SOURCE_PREFIX}{channel}"),
            )]);
        }
        let conversation = Conversation::open(user, ConversationState::BackupSource, now);
        self.store.save_conversation(&conversation).await?;
        self.send(
            chat,
            messages::BACKUP_CHOOSE_SOURCE,
            &SendOptions::new().with_markup(layout),
        )
        .await?;
        self.arm_prompt_timer(conversation, now);
        Ok(())
    }

    /// The user picked `source`; ask for the destination.
    ///
    /// Only honoured while the source offer from [`Engine::begin_backup`] is
    /// still open.
    pub async fn select_backup_source(
        &self,
        user: UserId,
        source: ChatId,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let chat = ChatId::from(user);
        if self.coordinator.backups().is_running(user) {
            self.send(chat, messages::BACKUP_ALREADY_RUNNING, &SendOptions::new())
                .await?;
            return Ok(());
        }

        match self.store.get_conversation(user).await? {
            Some(open) if open.state == ConversationState::BackupSource => {
                if open.is_expired(now) {
                    self.store.clear_conversation(user).await?;
                    self.metrics.increment_conversations_timed_out();
                    self.send(
                        chat,
                        FailureKind::PromptTimeout.user_message(),
                        &SendOptions::markdown(),
                    )
                    .await?;
                    return Ok(());
                }
            }
            _ => {
                debug!(user_id = %user, "backup source picked without an open offer");
                self.send(
                    chat,
                    FailureKind::PromptTimeout.user_message(),
                    &SendOptions::markdown(),
                )
                .await?;
                return Ok(());
            }
        }

        let owns_channel = self
            .store
            .get_user(user)
            .await?
            .is_some_and(|s| s.post_channels.contains(&source));
        if !owns_channel {
            self.send(chat, messages::UNKNOWN_CHANNEL, &SendOptions::new())
                .await?;
            return Ok(());
        }

        self.open_conversation(user, ConversationState::BackupDestination { source }, now)
            .await
    }

    /// Claim the user's slot and run the job in the background.
    ///
    /// Returns `false` when a job is already running; the running job is not
    /// affected.
    pub async fn start_backup(&self, job: BackupJob) -> Result<bool, EngineError> {
        let chat = ChatId::from(job.user_id);
        let Some(ticket) = self.coordinator.backups().try_acquire(job) else {
            self.send(chat, messages::BACKUP_ALREADY_RUNNING, &SendOptions::new())
                .await?;
            return Ok(false);
        };

        self.metrics.increment_backups_started();
        let engine = self.clone();
        self.coordinator.spawn(async move {
            engine.run_backup(ticket).await;
        });
        Ok(true)
    }

    /// Handle a cancel button press from `user`.
    pub fn cancel_backup(&self, user: UserId) -> bool {
        self.coordinator.backups().cancel(user)
    }

    /// Run a claimed job to completion. The slot is released on return.
    #[instrument(
        skip(self, ticket),
        fields(
            user_id = %ticket.job().user_id,
            source = %ticket.job().source,
            destination = %ticket.job().destination,
        )
    )]
    pub async fn run_backup(&self, ticket: BackupTicket) -> BackupStatus {
        let status = self.copy_posts(&ticket).await;
        match status {
            BackupStatus::Completed => self.metrics.increment_backups_completed(),
            BackupStatus::Cancelled => self.metrics.increment_backups_cancelled(),
            BackupStatus::Failed => self.metrics.increment_backups_failed(),
            BackupStatus::Running => {}
        }
        info!(?status, "backup finished");
        status
    }

    async fn copy_posts(&self, ticket: &BackupTicket) -> BackupStatus {
        let job = ticket.job();
        let chat = ChatId::from(job.user_id);
        let plain = SendOptions::new();

        let posts = match self
            .store
            .get_posts_for_backup(job.user_id, job.source)
            .await
        {
            Ok(posts) => posts,
            Err(e) => {
                error!(error = %e, "failed to load posts for backup");
                self.send_quietly(chat, messages::BACKUP_LOAD_FAILED, &plain)
                    .await;
                return BackupStatus::Failed;
            }
        };

        if posts.is_empty() {
            self.send_quietly(chat, messages::BACKUP_NO_POSTS, &plain)
                .await;
            return BackupStatus::Completed;
        }

        let total = posts.len();
        let cancel = ButtonLayout::single(Button::callback(
            messages::CANCEL_BACKUP_BUTTON,
            format!("{CANCEL_BACKUP_PREFIX}{}", job.user_id),
        ));
        let status_message = match self
            .send(
                chat,
                &messages::backup_starting(total),
                &SendOptions::new().with_markup(cancel.clone()),
            )
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "failed to send backup status message");
                None
            }
        };

        let every = self.config.backup_progress_every.max(1);
        let mut skipped = 0;
        for (index, post) in posts.iter().enumerate() {
            if ticket.is_cancelled() {
                info!(sent = index, total, "backup cancelled");
                self.send_quietly(chat, messages::BACKUP_CANCELLED, &plain)
                    .await;
                return BackupStatus::Cancelled;
            }

            if let Err(e) = self.send_backup_post(job, post).await {
                warn!(error = %e, index, "skipping post during backup");
                skipped += 1;
                self.metrics.increment_backup_items_skipped();
                self.send_quietly(chat, messages::BACKUP_ITEM_SKIPPED, &plain)
                    .await;
            }

            let done = index + 1;
            if done % every == 0
                && done < total
                && let Some(message_id) = status_message
            {
                self.update_progress(chat, message_id, done, total, &cancel)
                    .await;
            }
            if done < total {
                tokio::time::sleep(self.config.backup_delay).await;
            }
        }

        self.send_quietly(
            chat,
            &messages::backup_complete(total, skipped),
            &SendOptions::markdown(),
        )
        .await;
        BackupStatus::Completed
    }

    async fn send_backup_post(
        &self,
        job: &BackupJob,
        post: &BackupPost,
    ) -> Result<MessageId, PlatformError> {
        let caption = rewrite_get_links(&post.caption, job.user_id, &self.links);
        let markup = post
            .reply_markup
            .as_ref()
            .map(|layout| rewrite_markup(layout, self, job.user_id))
            .unwrap_or_default();
        let opts = SendOptions::markdown().with_markup(markup);

        match &post.poster {
            Some(poster) => {
                self.platform
                    .send_photo(job.destination, poster, &caption, &opts)
                    .await
            }
            None => {
                self.platform
                    .send_message(job.destination, &caption, &opts.without_preview())
                    .await
            }
        }
    }

    async fn update_progress(
        &self,
        chat: ChatId,
        message_id: MessageId,
        done: usize,
        total: usize,
        cancel: &ButtonLayout,
    ) {
        let text = messages::backup_progress(done, total);
        let opts = SendOptions::new().with_markup(cancel.clone());
        match self
            .platform
            .edit_message_text(chat, message_id, &text, &opts)
            .await
        {
            Ok(()) | Err(PlatformError::MessageNotModified) => {}
            Err(e) => debug!(error = %e, "failed to update backup progress"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(user: i64) -> BackupJob {
        BackupJob {
            user_id: UserId::new(user),
            source: ChatId::new(-1001),
            destination: ChatId::new(-1002),
        }
    }

    #[test]
    fn second_acquire_is_rejected_without_touching_first() {
        let registry = BackupRegistry::new();
        let first = registry.try_acquire(job(7)).unwrap();

        let mut other = job(7);
        other.destination = ChatId::new(-1003);
        assert!(registry.try_acquire(other).is_none());
        assert_eq!(registry.job(UserId::new(7)), Some(job(7)));
        assert!(!first.is_cancelled());
    }

    #[test]
    fn drop_releases_slot() {
        let registry = BackupRegistry::new();
        let ticket = registry.try_acquire(job(7)).unwrap();
        assert!(registry.is_running(UserId::new(7)));
        drop(ticket);
        assert!(!registry.is_running(UserId::new(7)));
        assert!(registry.try_acquire(job(7)).is_some());
    }

    #[test]
    fn cancel_flags_running_job() {
        let registry = BackupRegistry::new();
        assert!(!registry.cancel(UserId::new(7)));

        let ticket = registry.try_acquire(job(7)).unwrap();
        assert!(registry.cancel(UserId::new(7)));
        assert!(ticket.is_cancelled());
        // Still held until the run loop notices and drops the ticket.
        assert!(registry.is_running(UserId::new(7)));
    }

    #[test]
    fn users_are_independent() {
        let registry = BackupRegistry::new();
        let a = registry.try_acquire(job(7)).unwrap();
        let b = registry.try_acquire(job(8)).unwrap();
        assert_eq!(registry.len(), 2);

        registry.cancel_all();
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
    }
}
