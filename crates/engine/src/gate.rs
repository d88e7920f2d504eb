//! Force-subscribe gating for public requests.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use stashlink_core::{ChatId, OwnerSettings, SettingsUpdate, UserId};
use stashlink_platform::{DynPlatform, PlatformError, SendOptions};
use stashlink_store::Store;

use crate::error::EngineError;
use crate::messages;

/// Result of checking a requester against an owner's force-subscribe channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateVerdict {
    /// No channel configured, or the requester is a member.
    Allowed,
    /// The requester must join first. The invite link is best effort.
    MustJoin { invite_link: Option<String> },
    /// The bot can no longer use the channel. The owner's setting has been
    /// cleared and the owner notified.
    ChannelInvalid,
}

/// Probes channel membership and repairs settings that point at channels the
/// bot lost access to.
#[derive(Clone)]
pub struct AccessGate {
    platform: Arc<dyn DynPlatform>,
    store: Arc<dyn Store>,
    bot_id: UserId,
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate")
            .field("bot_id", &self.bot_id)
            .finish_non_exhaustive()
    }
}

impl AccessGate {
    pub fn new(platform: Arc<dyn DynPlatform>, store: Arc<dyn Store>, bot_id: UserId) -> Self {
        Self {
            platform,
            store,
            bot_id,
        }
    }

    /// Decide whether `requester` may proceed past `owner_id`'s gate.
    ///
    /// Transient platform errors propagate; channel-level errors turn into
    /// [`GateVerdict::ChannelInvalid`] after the self-heal.
    #[instrument(skip(self, settings), fields(owner_id = %owner_id, requester = %requester))]
    pub async fn check_membership(
        &self,
        owner_id: UserId,
        settings: &OwnerSettings,
        requester: UserId,
    ) -> Result<GateVerdict, EngineError> {
        let Some(channel) = settings.fsub_channel else {
            return Ok(GateVerdict::Allowed);
        };

        // The bot must still be in the channel to check anyone else.
        match self.platform.get_chat_member(channel, self.bot_id).await {
            Ok(status) if status.is_present() => {}
            Ok(status) => {
                self.self_heal(owner_id, channel, &format!("bot status {status:?}"))
                    .await;
                return Ok(GateVerdict::ChannelInvalid);
            }
            Err(e) if e.is_channel_unusable() => {
                self.self_heal(owner_id, channel, &e.to_string()).await;
                return Ok(GateVerdict::ChannelInvalid);
            }
            Err(e) => return Err(e.into()),
        }

        match self.platform.get_chat_member(channel, requester).await {
            Ok(status) if status.is_present() => Ok(GateVerdict::Allowed),
            Ok(_) | Err(PlatformError::UserNotParticipant) => {
                let invite_link = match self.platform.export_chat_invite_link(channel).await {
                    Ok(link) => Some(link),
                    Err(e) => {
                        debug!(error = %e, channel_id = %channel, "could not export invite link");
                        None
                    }
                };
                Ok(GateVerdict::MustJoin { invite_link })
            }
            Err(e) if e.is_channel_unusable() => {
                self.self_heal(owner_id, channel, &e.to_string()).await;
                Ok(GateVerdict::ChannelInvalid)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Clear the owner's channel and tell them. Failures are logged only.
    async fn self_heal(&self, owner_id: UserId, channel: ChatId, reason: &str) {
        warn!(channel_id = %channel, reason, "force-subscribe channel unusable, clearing it");

        if let Err(e) = self
            .store
            .update_user(owner_id, SettingsUpdate::FsubChannel(None))
            .await
        {
            warn!(error = %e, "failed to clear force-subscribe channel");
        }

        let notice = messages::fsub_channel_error(channel);
        match self
            .platform
            .send_message(ChatId::from(owner_id), &notice, &SendOptions::markdown())
            .await
        {
            Ok(_) => info!("owner notified about force-subscribe channel"),
            Err(e) => warn!(error = %e, "failed to notify owner about force-subscribe channel"),
        }
    }
}
