use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use stashlink_core::{
    Button, ButtonLayout, ChatId, DeepLinkRequest, DeliveryOutcome, FailureKind, FilePayload,
    IssuedLink, LinkConfig, MessageId, OwnerSettings, Rejection, ShortenerMode, UserId,
};
use stashlink_platform::{DynPlatform, SendOptions};
use stashlink_shortener::ShortenerAdapter;
use stashlink_store::Store;

use crate::config::EngineConfig;
use crate::coordinator::Coordinator;
use crate::error::EngineError;
use crate::gate::{AccessGate, GateVerdict};
use crate::ledger::VerificationLedger;
use crate::messages;
use crate::metrics::EngineMetrics;
use crate::probe::UrlProbe;
use crate::routing::{RETRY_PREFIX, Router};

/// The bot's request pipeline.
///
/// Cloning is cheap; every clone shares the same store, platform,
/// coordinator, and metrics.
#[derive(Clone)]
pub struct Engine {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) platform: Arc<dyn DynPlatform>,
    pub(crate) shortener: Arc<ShortenerAdapter>,
    pub(crate) probe: Arc<dyn UrlProbe>,
    pub(crate) links: Arc<LinkConfig>,
    pub(crate) config: Arc<EngineConfig>,
    pub(crate) bot_id: UserId,
    pub(crate) gate: AccessGate,
    pub(crate) ledger: VerificationLedger,
    pub(crate) coordinator: Arc<Coordinator>,
    pub(crate) metrics: Arc<EngineMetrics>,
    pub(crate) router: Arc<Router>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("links", &self.links)
            .field("config", &self.config)
            .field("bot_id", &self.bot_id)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn links(&self) -> &LinkConfig {
        &self.links
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn bot_id(&self) -> UserId {
        self.bot_id
    }

    /// Resolve a deep-link `start` payload for `requester`.
    pub async fn resolve(
        &self,
        requester: UserId,
        payload: &str,
    ) -> Result<DeliveryOutcome, EngineError> {
        self.resolve_at(requester, payload, Utc::now()).await
    }

    /// [`resolve`](Self::resolve) with an explicit clock.
    #[instrument(
        skip(self, payload, now),
        fields(requester = %requester, kind = tracing::field::Empty)
    )]
    pub async fn resolve_at(
        &self,
        requester: UserId,
        payload: &str,
        now: DateTime<Utc>,
    ) -> Result<DeliveryOutcome, EngineError> {
        self.metrics.increment_requests();

        let outcome = match DeepLinkRequest::decode(payload) {
            Ok(request) => {
                tracing::Span::current().record("kind", tracing::field::display(request.kind()));
                self.router.dispatch(self, requester, request, now).await?
            }
            Err(e) => {
                debug!(error = %e, "rejecting malformed payload");
                self.reject(requester, Rejection::MalformedPayload).await?
            }
        };

        match &outcome {
            DeliveryOutcome::Delivered => self.metrics.increment_delivered(),
            DeliveryOutcome::LinkIssued { .. } => self.metrics.increment_links_issued(),
            DeliveryOutcome::Rejected { .. } => self.metrics.increment_rejected(),
        }
        info!(?outcome, "resolve complete");
        Ok(outcome)
    }

    /// `ownerget`: only the owner may fetch, and no gate applies.
    pub(crate) async fn owner_get(
        &self,
        requester: UserId,
        payload: FilePayload,
        _now: DateTime<Utc>,
    ) -> Result<DeliveryOutcome, EngineError> {
        if requester != payload.owner_id {
            return self.reject(requester, Rejection::NotOwner).await;
        }
        self.deliver(requester, &payload).await
    }

    /// `finalget`: bookkeeping, then delivery.
    pub(crate) async fn final_get(
        &self,
        requester: UserId,
        payload: FilePayload,
        now: DateTime<Utc>,
    ) -> Result<DeliveryOutcome, EngineError> {
        let owner_id = payload.owner_id;
        if self
            .store
            .get_file_by_unique_id(owner_id, &payload.file_unique_id)
            .await?
            .is_none()
        {
            return self.reject(requester, Rejection::FileGone).await;
        }

        let mode = self
            .store
            .get_user(owner_id)
            .await?
            .map(|s| s.shortener_mode)
            .unwrap_or_default();

        if mode == ShortenerMode::TwelveHour {
            let claim = self
                .ledger
                .claim_at(owner_id, &payload.file_unique_id, requester, now)
                .await?;
            if claim.newly_granted {
                self.metrics.increment_verifications_granted();
            }
            if claim.should_announce() {
                self.send(
                    ChatId::from(requester),
                    messages::VERIFICATION_SUCCESS,
                    &SendOptions::markdown(),
                )
                .await?;
            }
        } else {
            self.record_view(owner_id, requester, now).await;
        }

        self.deliver(requester, &payload).await
    }

    /// `get`: gate, then present a direct or shortened `finalget` link.
    pub(crate) async fn public_get(
        &self,
        requester: UserId,
        payload: FilePayload,
        now: DateTime<Utc>,
    ) -> Result<DeliveryOutcome, EngineError> {
        let owner_id = payload.owner_id;
        let chat = ChatId::from(requester);

        if self
            .store
            .get_file_by_unique_id(owner_id, &payload.file_unique_id)
            .await?
            .is_none()
        {
            return self.reject(requester, Rejection::FileGone).await;
        }

        let settings = self
            .store
            .get_user(owner_id)
            .await?
            .unwrap_or_else(|| OwnerSettings::new(owner_id));

        match self
            .gate
            .check_membership(owner_id, &settings, requester)
            .await?
        {
            GateVerdict::Allowed => {}
            GateVerdict::MustJoin { invite_link } => {
                let mut layout = ButtonLayout::new();
                if let Some(link) = invite_link {
                    layout.push_row(vec![Button::url(messages::JOIN_CHANNEL_BUTTON, link)]);
                }
                layout.push_row(vec![retry_button(&payload)]);
                self.send(
                    chat,
                    FailureKind::NeedsJoin.user_message(),
                    &SendOptions::markdown().with_markup(layout),
                )
                .await?;
                return Ok(DeliveryOutcome::rejected(Rejection::NeedsJoin));
            }
            GateVerdict::ChannelInvalid => {
                // The owner has been told. The requester hears nothing.
                self.metrics.increment_fsub_self_heals();
                return Ok(DeliveryOutcome::rejected(Rejection::ChannelGone));
            }
        }

        let final_link = self
            .links
            .deep_link(&DeepLinkRequest::FinalGet(payload.clone()));

        let (text, label, url, kind) = if !settings.shortener_enabled {
            self.record_view(owner_id, requester, now).await;
            (
                messages::LINK_READY,
                messages::LINK_READY_BUTTON,
                final_link,
                IssuedLink::Direct,
            )
        } else if settings.shortener_mode == ShortenerMode::TwelveHour
            && self.ledger.is_verified_at(requester, owner_id, now).await?
        {
            self.record_view(owner_id, requester, now).await;
            (
                messages::ALREADY_VERIFIED,
                messages::ALREADY_VERIFIED_BUTTON,
                final_link,
                IssuedLink::Direct,
            )
        } else {
            self.metrics.increment_shortener_calls();
            let short = self.shortener.shorten(&final_link, owner_id).await;
            let kind = if short == final_link {
                self.metrics.increment_shortener_fallbacks();
                self.record_view(owner_id, requester, now).await;
                if self.coordinator.notices().should_notify(requester) {
                    self.send(
                        chat,
                        FailureKind::ShortenerUnavailable.user_message(),
                        &SendOptions::markdown(),
                    )
                    .await?;
                }
                IssuedLink::Fallback
            } else {
                IssuedLink::Shortened
            };
            match settings.shortener_mode {
                ShortenerMode::EachTime => (
                    messages::ALMOST_READY,
                    messages::ALMOST_READY_BUTTON,
                    short,
                    kind,
                ),
                ShortenerMode::TwelveHour => (
                    messages::VERIFY_REQUIRED,
                    messages::VERIFY_REQUIRED_BUTTON,
                    short,
                    kind,
                ),
            }
        };

        let mut layout = ButtonLayout::single(Button::url(label, url.clone()));
        if let Some(tutorial) = &settings.how_to_download_link {
            layout.push_row(vec![Button::url(
                messages::HOW_TO_DOWNLOAD_BUTTON,
                tutorial.clone(),
            )]);
        }

        let opts = SendOptions::markdown()
            .with_markup(layout)
            .without_preview();
        if self.send(chat, text, &opts).await?.is_none() {
            return Ok(DeliveryOutcome::rejected(Rejection::RecipientBlocked));
        }
        Ok(DeliveryOutcome::LinkIssued { url, kind })
    }

    /// Tell the requester why their request stopped, unless the reason is
    /// silent.
    pub(crate) async fn reject(
        &self,
        requester: UserId,
        reason: Rejection,
    ) -> Result<DeliveryOutcome, EngineError> {
        let kind = reason.failure_kind();
        if !kind.is_silent() {
            self.send(
                ChatId::from(requester),
                kind.user_message(),
                &SendOptions::markdown(),
            )
            .await?;
        }
        Ok(DeliveryOutcome::rejected(reason))
    }

    /// Send a message. A recipient who blocked the bot yields `Ok(None)`.
    pub(crate) async fn send(
        &self,
        chat_id: ChatId,
        text: &str,
        opts: &SendOptions,
    ) -> Result<Option<MessageId>, EngineError> {
        match self.platform.send_message(chat_id, text, opts).await {
            Ok(id) => Ok(Some(id)),
            Err(e) if e.is_blocked() => {
                debug!(chat_id = %chat_id, "recipient blocked the bot");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Send a notice whose failure must not affect the caller.
    pub(crate) async fn send_quietly(&self, chat_id: ChatId, text: &str, opts: &SendOptions) {
        if let Err(e) = self.send(chat_id, text, opts).await {
            warn!(error = %e, chat_id = %chat_id, "failed to send notice");
        }
    }

    pub(crate) async fn alert_admin(&self, text: &str) {
        self.metrics.increment_admin_alerts();
        self.send_quietly(
            ChatId::from(self.links.admin_id),
            text,
            &SendOptions::markdown(),
        )
        .await;
    }

    /// View counters are bookkeeping; a failed write is logged and ignored.
    pub(crate) async fn record_view(&self, owner_id: UserId, requester: UserId, now: DateTime<Utc>) {
        if let Err(e) = self.store.record_daily_view(owner_id, requester, now).await {
            warn!(error = %e, owner_id = %owner_id, "failed to record view");
        }
    }

    /// Cancel background work and wait for it to finish.
    pub async fn shutdown(&self) {
        self.coordinator.shutdown().await;
        info!("engine shutdown complete");
    }
}

fn retry_button(payload: &FilePayload) -> Button {
    let request = DeepLinkRequest::PublicGet(payload.clone());
    Button::callback(
        messages::RETRY_BUTTON,
        format!("{RETRY_PREFIX}{}", request.encode()),
    )
}
