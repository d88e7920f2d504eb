//! Dispatch tables for deep links and button presses, and the per-update
//! entry point.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use tracing::{debug, error, instrument};

use stashlink_core::{
    ChatId, DeepLinkRequest, DeliveryOutcome, FilePayload, LinkKind, Rejection, UserId,
};
use stashlink_platform::{CallbackQuery, IncomingMessage, SendOptions, Update, UpdateKind};

use crate::engine::Engine;
use crate::error::EngineError;
use crate::messages;

/// Callback data of the Retry button: `retry_<payload>`.
pub const RETRY_PREFIX: &str = "retry_";
/// Callback data of the backup Cancel button: `cancel_backup_<user id>`.
pub const CANCEL_BACKUP_PREFIX: &str = "cancel_backup_";
/// Callback data of a backup source choice: `backup_src_<channel id>`.
pub const BACKUP_SOURCE_PREFIX: &str = "backup_src_";
/// Callback data of settings menu buttons: `settings_<action>`.
pub const SETTINGS_PREFIX: &str = "settings_";

/// Handles one deep-link kind.
pub type LinkHandler = for<'a> fn(
    &'a Engine,
    UserId,
    FilePayload,
    DateTime<Utc>,
) -> BoxFuture<'a, Result<DeliveryOutcome, EngineError>>;

/// Handles a button press. Receives the callback data after the prefix.
pub type CallbackHandler = for<'a> fn(
    &'a Engine,
    &'a CallbackQuery,
    &'a str,
    DateTime<Utc>,
) -> BoxFuture<'a, Result<(), EngineError>>;

/// Maps link kinds and callback prefixes to handlers.
pub struct Router {
    links: HashMap<LinkKind, LinkHandler>,
    callbacks: Vec<(&'static str, CallbackHandler)>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.links.keys().map(|k| k.prefix()).collect();
        kinds.sort_unstable();
        let prefixes: Vec<_> = self.callbacks.iter().map(|(p, _)| *p).collect();
        f.debug_struct("Router")
            .field("links", &kinds)
            .field("callbacks", &prefixes)
            .finish()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::standard()
    }
}

impl Router {
    /// A router with no handlers.
    pub fn empty() -> Self {
        Self {
            links: HashMap::new(),
            callbacks: Vec::new(),
        }
    }

    /// The bot's full table.
    pub fn standard() -> Self {
        Self::empty()
            .with_link(LinkKind::PublicGet, route_public_get)
            .with_link(LinkKind::OwnerGet, route_owner_get)
            .with_link(LinkKind::FinalGet, route_final_get)
            .with_callback(RETRY_PREFIX, route_retry)
            .with_callback(CANCEL_BACKUP_PREFIX, route_cancel_backup)
            .with_callback(BACKUP_SOURCE_PREFIX, route_backup_source)
            .with_callback(SETTINGS_PREFIX, route_settings)
    }

    #[must_use]
    pub fn with_link(mut self, kind: LinkKind, handler: LinkHandler) -> Self {
        self.links.insert(kind, handler);
        self
    }

    #[must_use]
    pub fn with_callback(mut self, prefix: &'static str, handler: CallbackHandler) -> Self {
        self.callbacks.push((prefix, handler));
        self
    }

    /// Check that every link kind has a handler and that no callback prefix
    /// shadows another.
    pub fn validate(&self) -> Result<(), EngineError> {
        for kind in LinkKind::ALL {
            if !self.links.contains_key(&kind) {
                return Err(EngineError::Routing(format!(
                    "no handler for `{kind}` links"
                )));
            }
        }
        for (i, (a, _)) in self.callbacks.iter().enumerate() {
            if a.is_empty() {
                return Err(EngineError::Routing("empty callback prefix".into()));
            }
            for (b, _) in &self.callbacks[i + 1..] {
                if a.starts_with(b) || b.starts_with(a) {
                    return Err(EngineError::Routing(format!(
                        "callback prefixes `{a}` and `{b}` overlap"
                    )));
                }
            }
        }
        Ok(())
    }

    pub(crate) async fn dispatch(
        &self,
        engine: &Engine,
        requester: UserId,
        request: DeepLinkRequest,
        now: DateTime<Utc>,
    ) -> Result<DeliveryOutcome, EngineError> {
        let kind = request.kind();
        let handler = self
            .links
            .get(&kind)
            .ok_or_else(|| EngineError::Routing(format!("no handler for `{kind}` links")))?;
        handler(engine, requester, request.into_payload(), now).await
    }

    fn callback_for<'d>(&self, data: &'d str) -> Option<(CallbackHandler, &'d str)> {
        self.callbacks
            .iter()
            .find_map(|(prefix, handler)| data.strip_prefix(prefix).map(|rest| (*handler, rest)))
    }
}

fn route_public_get(
    engine: &Engine,
    requester: UserId,
    payload: FilePayload,
    now: DateTime<Utc>,
) -> BoxFuture<'_, Result<DeliveryOutcome, EngineError>> {
    Box::pin(engine.public_get(requester, payload, now))
}

fn route_owner_get(
    engine: &Engine,
    requester: UserId,
    payload: FilePayload,
    now: DateTime<Utc>,
) -> BoxFuture<'_, Result<DeliveryOutcome, EngineError>> {
    Box::pin(engine.owner_get(requester, payload, now))
}

fn route_final_get(
    engine: &Engine,
    requester: UserId,
    payload: FilePayload,
    now: DateTime<Utc>,
) -> BoxFuture<'_, Result<DeliveryOutcome, EngineError>> {
    Box::pin(engine.final_get(requester, payload, now))
}

fn route_retry<'a>(
    engine: &'a Engine,
    query: &'a CallbackQuery,
    payload: &'a str,
    now: DateTime<Utc>,
) -> BoxFuture<'a, Result<(), EngineError>> {
    Box::pin(engine.retry(query, payload, now))
}

fn route_cancel_backup<'a>(
    engine: &'a Engine,
    query: &'a CallbackQuery,
    owner: &'a str,
    _now: DateTime<Utc>,
) -> BoxFuture<'a, Result<(), EngineError>> {
    Box::pin(async move {
        let owner = owner.parse::<UserId>().ok();
        if owner != Some(query.from) {
            engine
                .answer(query, Some(messages::NOT_FOR_YOU), true)
                .await;
            return Ok(());
        }
        let text = if engine.cancel_backup(query.from) {
            messages::BACKUP_CANCELLING
        } else {
            messages::BACKUP_NOT_RUNNING
        };
        engine.answer(query, Some(text), false).await;
        Ok(())
    })
}

fn route_backup_source<'a>(
    engine: &'a Engine,
    query: &'a CallbackQuery,
    channel: &'a str,
    now: DateTime<Utc>,
) -> BoxFuture<'a, Result<(), EngineError>> {
    Box::pin(async move {
        engine.answer(query, None, false).await;
        match channel.parse::<ChatId>() {
            Ok(source) => engine.select_backup_source(query.from, source, now).await,
            Err(_) => {
                debug!(channel, "malformed backup source");
                Ok(())
            }
        }
    })
}

fn route_settings<'a>(
    engine: &'a Engine,
    query: &'a CallbackQuery,
    action: &'a str,
    now: DateTime<Utc>,
) -> BoxFuture<'a, Result<(), EngineError>> {
    Box::pin(async move {
        engine.answer(query, None, false).await;
        engine.apply_settings_action(query.from, action, now).await
    })
}

impl Engine {
    /// Handle one inbound update. Errors are logged and the sender gets a
    /// generic apology; nothing propagates to the polling loop.
    #[instrument(skip(self, update), fields(update_id = update.update_id))]
    pub async fn handle_update(&self, update: Update) {
        self.handle_update_at(update, Utc::now()).await;
    }

    /// [`handle_update`](Self::handle_update) with an explicit clock.
    pub async fn handle_update_at(&self, update: Update, now: DateTime<Utc>) {
        let (sender, result) = match &update.kind {
            UpdateKind::Message(message) => (
                message.from.filter(|_| message.is_private()),
                self.handle_message(message, now).await,
            ),
            UpdateKind::Callback(query) => {
                (Some(query.from), self.handle_callback(query, now).await)
            }
            UpdateKind::Other => (None, Ok(())),
        };

        if let Err(e) = result {
            error!(error = %e, retryable = e.is_retryable(), "update handling failed");
            if let Some(user) = sender {
                self.send_quietly(
                    ChatId::from(user),
                    messages::GENERIC_APOLOGY,
                    &SendOptions::new(),
                )
                .await;
            }
        }
    }

    /// Route a private message: commands first, then an open prompt, then
    /// file uploads.
    pub async fn handle_message(
        &self,
        message: &IncomingMessage,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        if !message.is_private() {
            return Ok(());
        }
        let Some(user) = message.from else {
            return Ok(());
        };
        self.store.add_user(user).await?;

        if let Some(text) = message.text.as_deref() {
            let text = text.trim();
            let (command, argument) = text.split_once(' ').unwrap_or((text, ""));
            match command {
                "/start" => {
                    let payload = argument.trim();
                    if payload.is_empty() {
                        self.send(ChatId::from(user), messages::WELCOME, &SendOptions::new())
                            .await?;
                    } else {
                        self.resolve_at(user, payload, now).await?;
                    }
                    return Ok(());
                }
                "/cancel" => {
                    self.cancel_conversation(user).await?;
                    return Ok(());
                }
                "/settings" => return self.show_settings(user).await,
                "/backup" => return self.begin_backup(user, now).await,
                _ => {}
            }
        }

        if self.has_open_conversation(user).await? {
            self.handle_reply(user, message, now).await?;
            return Ok(());
        }

        if message.media.is_some() {
            self.ingest_private_file(user, message).await?;
        }
        Ok(())
    }

    /// Route a button press through the callback table.
    pub async fn handle_callback(
        &self,
        query: &CallbackQuery,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        self.store.add_user(query.from).await?;

        let handler = query
            .data
            .as_deref()
            .and_then(|data| self.router.callback_for(data));
        match handler {
            Some((handler, rest)) => handler(self, query, rest, now).await,
            None => {
                debug!(data = ?query.data, "unrouted callback");
                self.answer(query, None, false).await;
                Ok(())
            }
        }
    }

    /// Re-run a public request after the user tapped Retry.
    async fn retry(
        &self,
        query: &CallbackQuery,
        payload: &str,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        if let Some((chat, message_id)) = query.message
            && let Err(e) = self.platform.delete_message(chat, message_id).await
        {
            debug!(error = %e, "could not delete retry prompt");
        }

        let outcome = self.resolve_at(query.from, payload, now).await?;
        if outcome.rejection() == Some(Rejection::RecipientBlocked) {
            self.answer(query, Some(messages::RETRY_BLOCKED), true)
                .await;
        } else {
            self.answer(query, None, false).await;
        }
        Ok(())
    }

    /// Acknowledge a button press. Failures are logged only.
    pub(crate) async fn answer(&self, query: &CallbackQuery, text: Option<&str>, alert: bool) {
        if let Err(e) = self.platform.answer_callback(&query.id, text, alert).await {
            debug!(error = %e, "failed to answer callback");
        }
    }
}
