//! Prompt-driven settings conversations and one-tap toggles.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use stashlink_core::button::{MAX_FOOTER_BUTTONS, MAX_FOOTER_TEXT_BYTES};
use stashlink_core::{
    Button, ButtonLayout, ChatId, Conversation, ConversationState, FailureKind, FooterButton,
    OwnerSettings, SettingsUpdate, ShortenerMode, UserId,
};
use stashlink_platform::{IncomingMessage, SendOptions};
use stashlink_shortener::normalize_domain;

use crate::backup::BackupJob;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::messages;
use crate::probe::{ProbeResult, normalize_url};
use crate::routing::SETTINGS_PREFIX;

/// What a reply did to the user's open conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationStep {
    /// No conversation was open.
    Idle,
    /// Moved to a further step that waits for another reply.
    Advanced(ConversationState),
    /// The change was applied and the conversation closed.
    Completed,
    /// The reply was rejected and the conversation closed.
    Invalid,
    /// The reply arrived after the prompt expired.
    TimedOut,
}

const ACTION_TOGGLE_SHORTENER: &str = "toggle_shortener";
const ACTION_TOGGLE_MODE: &str = "toggle_mode";
const ACTION_SET_FSUB: &str = "fsub";
const ACTION_REMOVE_FSUB: &str = "remove_fsub";
const ACTION_FILENAME_LINK: &str = "filename";
const ACTION_HOW_TO_DOWNLOAD: &str = "howto";
const ACTION_SHORTENER: &str = "shortener";
const ACTION_FOOTER: &str = "footer";
const ACTION_ADD_CHANNEL: &str = "add_channel";
const ACTION_BACKUP: &str = "backup";
const ACTION_REMOVE_CHANNEL: &str = "remove_channel_";

fn settings_button(text: impl Into<String>, action: &str) -> Button {
    Button::callback(text, format!("{SETTINGS_PREFIX}{action}"))
}

fn mode_label(mode: ShortenerMode) -> &'static str {
    match mode {
        ShortenerMode::EachTime => "each time",
        ShortenerMode::TwelveHour => "12 hour",
    }
}

/// A setting changed by a single button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    ShortenerEnabled,
    ShortenerMode,
}

impl Engine {
    /// Send the settings overview with one button per action.
    pub async fn show_settings(&self, user: UserId) -> Result<(), EngineError> {
        let settings = self
            .store
            .get_user(user)
            .await?
            .unwrap_or_else(|| OwnerSettings::new(user));

        let mode = mode_label(settings.shortener_mode);
        let fsub = settings
            .fsub_channel
            .map_or_else(|| "not set".to_owned(), |c| format!("`{c}`"));
        let text = format!(
            "⚙️ **Settings**\n\nShortener: {}\nMode: {mode}\nFSub channel: {fsub}\nPost channels: {}\nFooter buttons: {}/{MAX_FOOTER_BUTTONS}",
            if settings.shortener_enabled { "on" } else { "off" },
            settings.post_channels.len(),
            settings.footer_buttons.len(),
        );

        let mut layout = ButtonLayout::new()
            .row(vec![
                settings_button("🔗 Shortener on/off", ACTION_TOGGLE_SHORTENER),
                settings_button("⏱ Shortener mode", ACTION_TOGGLE_MODE),
            ])
            .row(vec![settings_button("🛠 Set shortener", ACTION_SHORTENER)])
            .row(vec![
                settings_button("📢 Set FSub", ACTION_SET_FSUB),
                settings_button("🗑 Remove FSub", ACTION_REMOVE_FSUB),
            ])
            .row(vec![
                settings_button("📝 File name link", ACTION_FILENAME_LINK),
                settings_button("❓ How to download", ACTION_HOW_TO_DOWNLOAD),
            ])
            .row(vec![
                settings_button("➕ Footer button", ACTION_FOOTER),
                settings_button("➕ Add channel", ACTION_ADD_CHANNEL),
            ])
            .row(vec![settings_button("💾 Backup", ACTION_BACKUP)]);
        for channel in &settings.post_channels {
            layout.push_row(vec![settings_button(
                format!("❌ Remove {channel}"),
                &format!("{ACTION_REMOVE_CHANNEL}{channel}"),
            )]);
        }

        self.send(
            ChatId::from(user),
            &text,
            &SendOptions::markdown().with_markup(layout),
        )
        .await?;
        Ok(())
    }

    /// Carry out a settings menu button.
    pub(crate) async fn apply_settings_action(
        &self,
        user: UserId,
        action: &str,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        match action {
            ACTION_TOGGLE_SHORTENER => self.toggle(user, Toggle::ShortenerEnabled).await,
            ACTION_TOGGLE_MODE => self.toggle(user, Toggle::ShortenerMode).await,
            ACTION_SET_FSUB => {
                self.open_conversation(user, ConversationState::FsubChannel, now)
                    .await
            }
            ACTION_REMOVE_FSUB => self.remove_fsub(user).await,
            ACTION_FILENAME_LINK => {
                self.open_conversation(user, ConversationState::FilenameLink, now)
                    .await
            }
            ACTION_HOW_TO_DOWNLOAD => {
                self.open_conversation(user, ConversationState::HowToDownload, now)
                    .await
            }
            ACTION_SHORTENER => {
                self.open_conversation(user, ConversationState::ShortenerDomain, now)
                    .await
            }
            ACTION_FOOTER => self.begin_footer_button(user, now).await,
            ACTION_ADD_CHANNEL => {
                self.open_conversation(user, ConversationState::PostChannel, now)
                    .await
            }
            ACTION_BACKUP => self.begin_backup(user, now).await,
            other => {
                match other
                    .strip_prefix(ACTION_REMOVE_CHANNEL)
                    .and_then(|id| id.parse::<ChatId>().ok())
                {
                    Some(channel) => self.remove_post_channel(user, channel).await.map(|_| ()),
                    None => {
                        debug!(action = other, "unknown settings action");
                        Ok(())
                    }
                }
            }
        }
    }

    /// Open `state` for `user`, replacing any prompt already open, and send
    /// the prompt text.
    #[instrument(skip(self, now), fields(user_id = %user))]
    pub async fn open_conversation(
        &self,
        user: UserId,
        state: ConversationState,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let conversation = Conversation::open(user, state, now);
        self.store.save_conversation(&conversation).await?;
        self.send(
            ChatId::from(user),
            &messages::prompt(conversation.state.prompt()),
            &SendOptions::markdown(),
        )
        .await?;
        self.arm_prompt_timer(conversation, now);
        Ok(())
    }

    /// Close `user`'s open prompt. Returns `false` when none was open.
    pub async fn cancel_conversation(&self, user: UserId) -> Result<bool, EngineError> {
        let cleared = self.store.clear_conversation(user).await?;
        let text = if cleared {
            messages::CANCELLED
        } else {
            messages::NOTHING_TO_CANCEL
        };
        self.send(ChatId::from(user), text, &SendOptions::new())
            .await?;
        Ok(cleared)
    }

    /// Whether `user` has a prompt waiting for a reply.
    pub async fn has_open_conversation(&self, user: UserId) -> Result<bool, EngineError> {
        Ok(self.store.get_conversation(user).await?.is_some())
    }

    /// Feed a reply into `user`'s open conversation.
    #[instrument(skip(self, message, now), fields(user_id = %user))]
    pub async fn handle_reply(
        &self,
        user: UserId,
        message: &IncomingMessage,
        now: DateTime<Utc>,
    ) -> Result<ConversationStep, EngineError> {
        let Some(conversation) = self.store.get_conversation(user).await? else {
            return Ok(ConversationStep::Idle);
        };
        let chat = ChatId::from(user);

        if conversation.is_expired(now) {
            self.store.clear_conversation(user).await?;
            self.metrics.increment_conversations_timed_out();
            self.send(
                chat,
                FailureKind::PromptTimeout.user_message(),
                &SendOptions::markdown(),
            )
            .await?;
            return Ok(ConversationStep::TimedOut);
        }

        let step = self.apply_reply(&conversation, message).await;
        match &step {
            Ok(ConversationStep::Advanced(next)) => {
                let next = conversation.advance(next.clone(), now);
                self.store.save_conversation(&next).await?;
                self.send(
                    chat,
                    &messages::prompt(next.state.prompt()),
                    &SendOptions::markdown(),
                )
                .await?;
                self.arm_prompt_timer(next, now);
            }
            // Partial values never outlive the conversation, even on error.
            _ => {
                self.store.clear_conversation(user).await?;
            }
        }
        let step = step?;
        info!(?step, "conversation step");
        Ok(step)
    }

    async fn apply_reply(
        &self,
        conversation: &Conversation,
        message: &IncomingMessage,
    ) -> Result<ConversationStep, EngineError> {
        let user = conversation.user_id;
        let chat = ChatId::from(user);

        match &conversation.state {
            ConversationState::FsubChannel => {
                let Some(channel) = self.forwarded_admin_channel(chat, message).await? else {
                    return Ok(ConversationStep::Invalid);
                };
                self.store
                    .update_user(user, SettingsUpdate::FsubChannel(Some(channel)))
                    .await?;
                self.confirm(chat, messages::FSUB_SET).await
            }
            ConversationState::PostChannel => {
                let Some(channel) = self.forwarded_admin_channel(chat, message).await? else {
                    return Ok(ConversationStep::Invalid);
                };
                self.store
                    .update_user(user, SettingsUpdate::AddPostChannel(channel))
                    .await?;
                self.confirm(chat, messages::POST_CHANNEL_ADDED).await
            }
            ConversationState::FilenameLink => {
                let Some(text) = self.text_reply(chat, message).await? else {
                    return Ok(ConversationStep::Invalid);
                };
                self.store
                    .update_user(user, SettingsUpdate::FilenameUrl(Some(normalize_url(text))))
                    .await?;
                self.confirm(chat, messages::FILENAME_LINK_SET).await
            }
            ConversationState::HowToDownload => {
                let Some(text) = self.text_reply(chat, message).await? else {
                    return Ok(ConversationStep::Invalid);
                };
                let url = normalize_url(text);
                if !self.check_link(chat, &url).await? {
                    return Ok(ConversationStep::Invalid);
                }
                self.store
                    .update_user(user, SettingsUpdate::HowToDownloadLink(Some(url)))
                    .await?;
                self.confirm(chat, messages::HOW_TO_DOWNLOAD_SET).await
            }
            ConversationState::ShortenerDomain => {
                let Some(text) = self.text_reply(chat, message).await? else {
                    return Ok(ConversationStep::Invalid);
                };
                Ok(ConversationStep::Advanced(
                    ConversationState::ShortenerApiKey {
                        domain: normalize_domain(text),
                    },
                ))
            }
            ConversationState::ShortenerApiKey { domain } => {
                let Some(api_key) = self.text_reply(chat, message).await? else {
                    return Ok(ConversationStep::Invalid);
                };
                if !self.shortener.validate(domain, api_key).await {
                    self.send(chat, messages::SHORTENER_INVALID, &SendOptions::markdown())
                        .await?;
                    return Ok(ConversationStep::Invalid);
                }
                self.store
                    .update_user(
                        user,
                        SettingsUpdate::Shortener {
                            domain: domain.clone(),
                            api_key: api_key.to_owned(),
                        },
                    )
                    .await?;
                self.confirm(chat, messages::SHORTENER_SET).await
            }
            ConversationState::FooterText => {
                let Some(text) = self.text_reply(chat, message).await? else {
                    return Ok(ConversationStep::Invalid);
                };
                if text.len() > MAX_FOOTER_TEXT_BYTES {
                    self.send(chat, messages::FOOTER_TEXT_TOO_LONG, &SendOptions::new())
                        .await?;
                    return Ok(ConversationStep::Invalid);
                }
                Ok(ConversationStep::Advanced(ConversationState::FooterUrl {
                    text: text.to_owned(),
                }))
            }
            ConversationState::FooterUrl { text } => {
                let Some(raw) = self.text_reply(chat, message).await? else {
                    return Ok(ConversationStep::Invalid);
                };
                let url = normalize_url(raw);
                if !self.check_link(chat, &url).await? {
                    return Ok(ConversationStep::Invalid);
                }
                if self.footer_count(user).await? >= MAX_FOOTER_BUTTONS {
                    self.send(chat, messages::FOOTER_LIMIT, &SendOptions::new())
                        .await?;
                    return Ok(ConversationStep::Invalid);
                }
                self.store
                    .update_user(
                        user,
                        SettingsUpdate::AddFooterButton(FooterButton {
                            text: text.clone(),
                            url,
                        }),
                    )
                    .await?;
                self.confirm(chat, messages::FOOTER_ADDED).await
            }
            ConversationState::BackupSource => {
                self.send(chat, messages::BACKUP_PICK_BUTTON, &SendOptions::new())
                    .await?;
                Ok(ConversationStep::Invalid)
            }
            ConversationState::BackupDestination { source } => {
                let Some(destination) = self.forwarded_admin_channel(chat, message).await? else {
                    return Ok(ConversationStep::Invalid);
                };
                self.start_backup(BackupJob {
                    user_id: user,
                    source: *source,
                    destination,
                })
                .await?;
                Ok(ConversationStep::Completed)
            }
        }
    }

    async fn confirm(&self, chat: ChatId, text: &str) -> Result<ConversationStep, EngineError> {
        self.send(chat, text, &SendOptions::markdown()).await?;
        Ok(ConversationStep::Completed)
    }

    /// The trimmed text of `message`, or `None` after telling the user a
    /// text reply is needed.
    async fn text_reply<'m>(
        &self,
        chat: ChatId,
        message: &'m IncomingMessage,
    ) -> Result<Option<&'m str>, EngineError> {
        match message.text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => Ok(Some(text)),
            _ => {
                self.send(chat, messages::TEXT_REQUIRED, &SendOptions::new())
                    .await?;
                Ok(None)
            }
        }
    }

    /// The channel `message` was forwarded from, provided the bot administers
    /// it.
    async fn forwarded_admin_channel(
        &self,
        chat: ChatId,
        message: &IncomingMessage,
    ) -> Result<Option<ChatId>, EngineError> {
        let Some(channel) = message.forward_from_chat else {
            self.send(chat, messages::FORWARD_REQUIRED, &SendOptions::new())
                .await?;
            return Ok(None);
        };

        let is_admin = match self.platform.get_chat_member(channel, self.bot_id).await {
            Ok(status) => status.is_admin(),
            Err(e) if e.is_channel_unusable() => false,
            Err(e) => return Err(e.into()),
        };
        if !is_admin {
            self.send(chat, messages::PERMISSION_DENIED, &SendOptions::markdown())
                .await?;
            return Ok(None);
        }
        Ok(Some(channel))
    }

    /// Probe `url`, telling the user when it does not answer.
    async fn check_link(&self, chat: ChatId, url: &str) -> Result<bool, EngineError> {
        let text = match self.probe.probe(url).await {
            ProbeResult::Reachable => return Ok(true),
            ProbeResult::Unreachable => messages::INVALID_LINK,
            ProbeResult::TimedOut => FailureKind::ValidationTimeout.user_message(),
        };
        self.send(chat, text, &SendOptions::new()).await?;
        Ok(false)
    }

    async fn footer_count(&self, user: UserId) -> Result<usize, EngineError> {
        Ok(self
            .store
            .get_user(user)
            .await?
            .map_or(0, |s| s.footer_buttons.len()))
    }

    /// Start the add-footer-button conversation unless the limit is reached.
    pub async fn begin_footer_button(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        if self.footer_count(user).await? >= MAX_FOOTER_BUTTONS {
            self.send(ChatId::from(user), messages::FOOTER_LIMIT, &SendOptions::new())
                .await?;
            return Ok(());
        }
        self.open_conversation(user, ConversationState::FooterText, now)
            .await
    }

    /// Clear the force-subscribe channel.
    pub async fn remove_fsub(&self, user: UserId) -> Result<(), EngineError> {
        self.store
            .update_user(user, SettingsUpdate::FsubChannel(None))
            .await?;
        self.send(ChatId::from(user), messages::FSUB_REMOVED, &SendOptions::new())
            .await?;
        Ok(())
    }

    /// Flip a boolean-like setting and report its new value.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn toggle(&self, user: UserId, toggle: Toggle) -> Result<(), EngineError> {
        self.store.add_user(user).await?;
        let settings = self
            .store
            .get_user(user)
            .await?
            .ok_or_else(|| EngineError::Configuration(format!("user {user} vanished")))?;

        let (update, text) = match toggle {
            Toggle::ShortenerEnabled => {
                let enabled = !settings.shortener_enabled;
                (
                    SettingsUpdate::ShortenerEnabled(enabled),
                    messages::shortener_toggled(enabled),
                )
            }
            Toggle::ShortenerMode => {
                let mode = settings.shortener_mode.toggled();
                (
                    SettingsUpdate::ShortenerMode(mode),
                    messages::shortener_mode_changed(mode_label(mode)),
                )
            }
        };
        self.store.update_user(user, update).await?;
        self.send(ChatId::from(user), &text, &SendOptions::markdown())
            .await?;
        Ok(())
    }

    /// Remove `channel` from the user's post channels along with every
    /// backup post saved from it. Returns the number of posts deleted.
    #[instrument(skip(self), fields(user_id = %user, channel_id = %channel))]
    pub async fn remove_post_channel(
        &self,
        user: UserId,
        channel: ChatId,
    ) -> Result<u64, EngineError> {
        self.store
            .update_user(user, SettingsUpdate::RemovePostChannel(channel))
            .await?;
        let deleted = self.store.delete_posts_from_channel(user, channel).await?;
        info!(deleted, "post channel removed");
        self.send(
            ChatId::from(user),
            &messages::channel_removed(deleted),
            &SendOptions::new(),
        )
        .await?;
        Ok(deleted)
    }

    /// Close every conversation left over from a previous process and tell
    /// each user. Returns how many were closed.
    #[instrument(skip(self))]
    pub async fn sweep_conversations(&self) -> Result<usize, EngineError> {
        let leftovers = self.store.list_conversations().await?;
        let count = leftovers.len();
        for conversation in leftovers {
            let user = conversation.user_id;
            if let Err(e) = self.store.clear_conversation(user).await {
                warn!(error = %e, user_id = %user, "failed to clear stale conversation");
                continue;
            }
            self.send_quietly(
                ChatId::from(user),
                messages::RESTART_CANCELLED,
                &SendOptions::new(),
            )
            .await;
        }
        if count > 0 {
            info!(count, "closed conversations left by the previous process");
        }
        Ok(count)
    }

    /// Expire `conversation` when its reply window closes, unless it was
    /// answered or replaced first.
    pub(crate) fn arm_prompt_timer(&self, conversation: Conversation, now: DateTime<Utc>) {
        let wait = (conversation.expires_at - now).to_std().unwrap_or_default();
        let engine = self.clone();
        let shutdown = self.coordinator.shutdown_token().clone();
        self.coordinator.spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(wait) => engine.expire_conversation(&conversation).await,
                () = shutdown.cancelled() => {}
            }
        });
    }

    async fn expire_conversation(&self, conversation: &Conversation) {
        let user = conversation.user_id;
        match self.store.get_conversation(user).await {
            Ok(Some(current)) if current == *conversation => {}
            Ok(_) => return,
            Err(e) => {
                warn!(error = %e, user_id = %user, "failed to read conversation for timeout");
                return;
            }
        }
        if let Err(e) = self.store.clear_conversation(user).await {
            warn!(error = %e, user_id = %user, "failed to clear timed-out conversation");
            return;
        }
        self.metrics.increment_conversations_timed_out();
        info!(user_id = %user, "prompt timed out");
        self.send_quietly(
            ChatId::from(user),
            FailureKind::PromptTimeout.user_message(),
            &SendOptions::markdown(),
        )
        .await;
    }
}
