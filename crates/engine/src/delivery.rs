//! Copying stored files to requesters and taking in new uploads.

use tracing::{debug, error, info, instrument};

use stashlink_core::{
    Button, ButtonLayout, ChatId, DeepLinkRequest, DeliveryOutcome, FailureKind, FilePayload,
    FileRecord, MessageId, Rejection, UserId,
};
use stashlink_platform::{IncomingMessage, PlatformError, SendOptions};

use crate::caption::{clean_file_name, delivery_caption};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::messages;

/// Name used when an upload carries none.
const DEFAULT_FILE_NAME: &str = "file";

/// Errors meaning the owner-db channel itself is unusable.
fn is_storage_failure(e: &PlatformError) -> bool {
    matches!(
        e,
        PlatformError::PeerIdInvalid
            | PlatformError::ChatNotFound
            | PlatformError::ChannelInvalid
            | PlatformError::ChannelPrivate
    )
}

impl Engine {
    /// The single "Fast Download" button, built from the current host and
    /// port.
    pub fn fast_download_markup(&self, stream_id: MessageId) -> ButtonLayout {
        ButtonLayout::single(Button::url(
            messages::FAST_DOWNLOAD_BUTTON,
            self.links.download_url(stream_id),
        ))
    }

    /// Copy the stored file to `requester`.
    #[instrument(
        skip(self, payload),
        fields(owner_id = %payload.owner_id, file_unique_id = %payload.file_unique_id)
    )]
    pub(crate) async fn deliver(
        &self,
        requester: UserId,
        payload: &FilePayload,
    ) -> Result<DeliveryOutcome, EngineError> {
        let Some(file) = self
            .store
            .get_file_by_unique_id(payload.owner_id, &payload.file_unique_id)
            .await?
        else {
            return self.reject(requester, Rejection::FileGone).await;
        };

        let settings = self.store.get_user(payload.owner_id).await?.ok_or_else(|| {
            EngineError::Configuration(format!("no settings for owner {}", payload.owner_id))
        })?;

        let Some(db_channel) = self.links.owner_db_channel else {
            error!("owner-db channel is not configured");
            self.alert_admin(&messages::storage_alert(
                "unset",
                "OWNER_DB_CHANNEL is not configured",
            ))
            .await;
            return self.reject(requester, Rejection::StorageUnavailable).await;
        };

        let caption = delivery_caption(
            &file.file_name,
            settings.filename_url.as_deref(),
            &self.config.caption_suffix,
        );
        let opts = SendOptions::markdown().with_markup(self.fast_download_markup(file.stream_id));

        match self
            .platform
            .copy_message(
                ChatId::from(requester),
                db_channel,
                file.file_id,
                Some(&caption),
                &opts,
            )
            .await
        {
            Ok(_) => {
                info!("file delivered");
                Ok(DeliveryOutcome::Delivered)
            }
            Err(e) if e.is_blocked() => {
                info!("requester blocked the bot, skipping delivery");
                Ok(DeliveryOutcome::rejected(Rejection::RecipientBlocked))
            }
            Err(e) if is_storage_failure(&e) => {
                error!(error = %e, channel_id = %db_channel, "owner-db channel unusable");
                self.alert_admin(&messages::storage_alert(db_channel, &e))
                    .await;
                self.reject(requester, Rejection::StorageUnavailable).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Copy a privately sent file into the owner-db channel and hand the
    /// uploader its links.
    ///
    /// Returns the saved record, or `None` when nothing was stored.
    #[instrument(skip(self, message), fields(user_id = %user))]
    pub async fn ingest_private_file(
        &self,
        user: UserId,
        message: &IncomingMessage,
    ) -> Result<Option<FileRecord>, EngineError> {
        let Some(media) = &message.media else {
            return Ok(None);
        };
        let chat = ChatId::from(user);

        let Some(db_channel) = self.links.owner_db_channel else {
            self.send(chat, messages::NOT_CONFIGURED, &SendOptions::new())
                .await?;
            return Ok(None);
        };

        self.store.add_user(user).await?;

        let stored = match self
            .platform
            .copy_message(
                db_channel,
                message.chat_id,
                message.message_id,
                None,
                &SendOptions::new(),
            )
            .await
        {
            Ok(id) => id,
            Err(e) if is_storage_failure(&e) => {
                error!(error = %e, channel_id = %db_channel, "owner-db channel unusable");
                self.alert_admin(&messages::storage_alert(db_channel, &e))
                    .await;
                self.send(
                    chat,
                    FailureKind::InvalidRecipientChannel.user_message(),
                    &SendOptions::new(),
                )
                .await?;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let record = FileRecord {
            owner_id: user,
            file_unique_id: media.file_unique_id.clone(),
            file_name: media
                .file_name
                .clone()
                .unwrap_or_else(|| DEFAULT_FILE_NAME.to_owned()),
            file_id: stored,
            stream_id: stored,
        };
        self.store.save_file(record.clone()).await?;
        self.metrics.increment_files_ingested();
        info!(file_unique_id = %record.file_unique_id, "file stored");

        let share = self
            .links
            .deep_link(&DeepLinkRequest::PublicGet(record.payload()));
        let markup = self
            .fast_download_markup(stored)
            .row(vec![Button::url(messages::SHARE_LINK_BUTTON, share)]);
        let caption = messages::file_saved(&clean_file_name(&record.file_name));

        match self
            .platform
            .send_cached_media(
                chat,
                &media.file_id,
                &caption,
                &SendOptions::markdown().with_markup(markup),
            )
            .await
        {
            Ok(_) => {}
            Err(e) if e.is_blocked() => debug!("uploader blocked the bot"),
            Err(e) => return Err(e.into()),
        }
        Ok(Some(record))
    }
}
