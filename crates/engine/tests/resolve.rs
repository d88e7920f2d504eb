//! Deep-link resolution across the three link kinds.

mod common;

use common::*;

use stashlink_core::{
    Button, ButtonLayout, DeliveryOutcome, FailureKind, IssuedLink, LinkConfig, Rejection,
    SettingsUpdate, ShortenerMode,
};
use stashlink_engine::{EngineConfig, messages};
use stashlink_platform::MemberStatus;
use stashlink_store::Store;

const FINAL_LINK: &str = "https://t.me/StashBot?start=finalget_5_abc123";

fn public_payload() -> String {
    format!("get_{OWNER}_{FILE_ID}")
}

mod payloads {
    use super::*;

    #[tokio::test]
    async fn malformed_payload_is_rejected() {
        let env = TestEnv::new();
        let outcome = env
            .engine
            .resolve_at(REQUESTER, "definitely-not-a-link", now())
            .await
            .unwrap();

        assert_eq!(outcome, DeliveryOutcome::rejected(Rejection::MalformedPayload));
        assert_eq!(
            env.platform.texts_to(chat(REQUESTER)),
            vec![FailureKind::MalformedPayload.user_message()]
        );
        let metrics = env.engine.metrics().snapshot();
        assert_eq!(metrics.requests, 1);
        assert_eq!(metrics.rejected, 1);
    }

    #[tokio::test]
    async fn unknown_file_is_rejected() {
        let env = TestEnv::new();
        env.owner_with_file().await;

        let outcome = env
            .engine
            .resolve_at(REQUESTER, "get_5_missing", now())
            .await
            .unwrap();

        assert_eq!(outcome, DeliveryOutcome::rejected(Rejection::FileGone));
        assert_eq!(
            env.platform.texts_to(chat(REQUESTER)),
            vec![FailureKind::FileGone.user_message()]
        );
    }
}

mod owner_get {
    use super::*;

    #[tokio::test]
    async fn owner_receives_file_without_gate() {
        let env = TestEnv::new();
        env.owner_with_file().await;
        env.update_owner(SettingsUpdate::FsubChannel(Some(FSUB_CHANNEL)))
            .await;

        let outcome = env
            .engine
            .resolve_at(OWNER, "ownerget_5_abc123", now())
            .await
            .unwrap();

        assert_eq!(outcome, DeliveryOutcome::Delivered);
        assert_eq!(env.platform.membership_probes(), 0);

        let copy = env
            .platform
            .calls()
            .into_iter()
            .find_map(|call| match call {
                Call::CopyMessage {
                    chat: to,
                    from,
                    message,
                    caption,
                    opts,
                } => Some((to, from, message, caption, opts)),
                _ => None,
            })
            .expect("file should be copied");
        assert_eq!(copy.0, chat(OWNER));
        assert_eq!(copy.1, DB_CHANNEL);
        assert_eq!(copy.2.get(), 31);
        assert_eq!(
            copy.3.as_deref(),
            Some("✅ **Here is your file!**\n\n`Holiday Clip.mp4`")
        );
        assert_eq!(
            copy.4.reply_markup,
            Some(ButtonLayout::single(Button::url(
                messages::FAST_DOWNLOAD_BUTTON,
                "http://10.0.0.1:7071/download/31"
            )))
        );
        assert_eq!(env.engine.metrics().snapshot().delivered, 1);
    }

    #[tokio::test]
    async fn other_users_are_refused() {
        let env = TestEnv::new();
        env.owner_with_file().await;

        let outcome = env
            .engine
            .resolve_at(REQUESTER, "ownerget_5_abc123", now())
            .await
            .unwrap();

        assert_eq!(outcome, DeliveryOutcome::rejected(Rejection::NotOwner));
        assert_eq!(
            env.platform.texts_to(chat(REQUESTER)),
            vec![FailureKind::NotOwner.user_message()]
        );
        assert!(
            !env.platform
                .calls()
                .iter()
                .any(|c| matches!(c, Call::CopyMessage { .. }))
        );
    }

    #[tokio::test]
    async fn caption_uses_filename_link_and_suffix() {
        let env = TestEnv::with_config(EngineConfig::default().with_caption_suffix("\n\nvia us"));
        env.owner_with_file().await;
        env.update_owner(SettingsUpdate::FilenameUrl(Some(
            "https://site.example".into(),
        )))
        .await;

        env.engine
            .resolve_at(OWNER, "ownerget_5_abc123", now())
            .await
            .unwrap();

        let caption = env.platform.calls().into_iter().find_map(|call| match call {
            Call::CopyMessage { caption, .. } => caption,
            _ => None,
        });
        assert_eq!(
            caption.as_deref(),
            Some("✅ **Here is your file!**\n\n[Holiday Clip.mp4](https://site.example)\n\nvia us")
        );
    }
}

mod public_get {
    use super::*;

    #[tokio::test]
    async fn disabled_shortener_issues_direct_link() {
        let env = TestEnv::new();
        env.owner_with_file().await;
        env.update_owner(SettingsUpdate::ShortenerEnabled(false))
            .await;

        let outcome = env
            .engine
            .resolve_at(REQUESTER, &public_payload(), now())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            DeliveryOutcome::LinkIssued {
                url: FINAL_LINK.into(),
                kind: IssuedLink::Direct,
            }
        );
        let (text, opts) = env.platform.sent_to(chat(REQUESTER)).pop().unwrap();
        assert_eq!(text, messages::LINK_READY);
        assert!(opts.disable_preview);
        assert_eq!(
            opts.reply_markup,
            Some(ButtonLayout::single(Button::url(
                messages::LINK_READY_BUTTON,
                FINAL_LINK
            )))
        );
        assert_eq!(env.views_today().await, 1);
        assert_eq!(env.engine.metrics().snapshot().shortener_calls, 0);
    }

    #[tokio::test]
    async fn how_to_download_button_is_attached() {
        let env = TestEnv::new();
        env.owner_with_file().await;
        env.update_owner(SettingsUpdate::ShortenerEnabled(false))
            .await;
        env.update_owner(SettingsUpdate::HowToDownloadLink(Some(
            "https://howto.example".into(),
        )))
        .await;

        env.engine
            .resolve_at(REQUESTER, &public_payload(), now())
            .await
            .unwrap();

        assert_eq!(
            env.platform.last_markup_to(chat(REQUESTER)),
            Some(
                ButtonLayout::single(Button::url(messages::LINK_READY_BUTTON, FINAL_LINK)).row(
                    vec![Button::url(
                        messages::HOW_TO_DOWNLOAD_BUTTON,
                        "https://howto.example"
                    )]
                )
            )
        );
    }

    #[tokio::test]
    async fn verified_requester_skips_the_shortener() {
        let env = TestEnv::new();
        env.owner_with_file().await;
        env.update_owner(SettingsUpdate::ShortenerMode(ShortenerMode::TwelveHour))
            .await;
        env.store
            .claim_verification_for_file(
                OWNER,
                FILE_ID,
                REQUESTER,
                now(),
                stashlink_core::verification_window(),
            )
            .await
            .unwrap();

        let outcome = env
            .engine
            .resolve_at(REQUESTER, &public_payload(), now())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            DeliveryOutcome::LinkIssued {
                url: FINAL_LINK.into(),
                kind: IssuedLink::Direct,
            }
        );
        assert_eq!(
            env.platform.texts_to(chat(REQUESTER)),
            vec![messages::ALREADY_VERIFIED]
        );
        assert_eq!(env.engine.metrics().snapshot().shortener_calls, 0);
    }

    #[tokio::test]
    async fn owner_shortener_wraps_the_link() {
        let env = TestEnv::new();
        let shortener = MockShortener::success("https://sho.rt/xyz").await;
        env.owner_with_file().await;
        env.update_owner(SettingsUpdate::Shortener {
            domain: shortener.domain.clone(),
            api_key: "k3y".into(),
        })
        .await;

        let outcome = env
            .engine
            .resolve_at(REQUESTER, &public_payload(), now())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            DeliveryOutcome::LinkIssued {
                url: "https://sho.rt/xyz".into(),
                kind: IssuedLink::Shortened,
            }
        );
        assert_eq!(shortener.requests(), 1);
        let (text, opts) = env.platform.sent_to(chat(REQUESTER)).pop().unwrap();
        assert_eq!(text, messages::ALMOST_READY);
        assert_eq!(
            opts.reply_markup,
            Some(ButtonLayout::single(Button::url(
                messages::ALMOST_READY_BUTTON,
                "https://sho.rt/xyz"
            )))
        );
        // The view is counted when the shortened link leads back to finalget.
        assert_eq!(env.views_today().await, 0);
    }

    #[tokio::test]
    async fn twelve_hour_mode_asks_for_verification() {
        let env = TestEnv::new();
        let shortener = MockShortener::success("https://sho.rt/v").await;
        env.owner_with_file().await;
        env.update_owner(SettingsUpdate::Shortener {
            domain: shortener.domain.clone(),
            api_key: "k3y".into(),
        })
        .await;
        env.update_owner(SettingsUpdate::ShortenerMode(ShortenerMode::TwelveHour))
            .await;

        env.engine
            .resolve_at(REQUESTER, &public_payload(), now())
            .await
            .unwrap();

        assert_eq!(
            env.platform.texts_to(chat(REQUESTER)),
            vec![messages::VERIFY_REQUIRED]
        );
    }

    #[tokio::test]
    async fn failed_shortener_falls_back_and_notifies_once() {
        let env = TestEnv::new();
        env.owner_with_file().await;

        for _ in 0..2 {
            let outcome = env
                .engine
                .resolve_at(REQUESTER, &public_payload(), now())
                .await
                .unwrap();
            assert_eq!(
                outcome,
                DeliveryOutcome::LinkIssued {
                    url: FINAL_LINK.into(),
                    kind: IssuedLink::Fallback,
                }
            );
        }

        assert_eq!(
            env.platform.count_text(
                chat(REQUESTER),
                FailureKind::ShortenerUnavailable.user_message()
            ),
            1
        );
        assert_eq!(env.platform.count_text(chat(REQUESTER), messages::ALMOST_READY), 2);
        let metrics = env.engine.metrics().snapshot();
        assert_eq!(metrics.shortener_calls, 2);
        assert_eq!(metrics.shortener_fallbacks, 2);
        assert_eq!(env.views_today().await, 2);
    }

    #[tokio::test]
    async fn blocked_requester_is_not_messaged() {
        let env = TestEnv::new();
        env.owner_with_file().await;
        env.update_owner(SettingsUpdate::ShortenerEnabled(false))
            .await;
        env.platform.fail_sends_to(chat(REQUESTER), Fail::Blocked);

        let outcome = env
            .engine
            .resolve_at(REQUESTER, &public_payload(), now())
            .await
            .unwrap();

        assert_eq!(outcome, DeliveryOutcome::rejected(Rejection::RecipientBlocked));
    }
}

mod force_subscribe {
    use super::*;

    async fn gated_env() -> TestEnv {
        let env = TestEnv::new();
        env.owner_with_file().await;
        env.update_owner(SettingsUpdate::ShortenerEnabled(false))
            .await;
        env.update_owner(SettingsUpdate::FsubChannel(Some(FSUB_CHANNEL)))
            .await;
        env
    }

    fn retry() -> Button {
        Button::callback(messages::RETRY_BUTTON, "retry_get_5_abc123")
    }

    #[tokio::test]
    async fn member_passes_the_gate() {
        let env = gated_env().await;
        env.platform
            .set_member(FSUB_CHANNEL, BOT, MemberStatus::Administrator);
        env.platform
            .set_member(FSUB_CHANNEL, REQUESTER, MemberStatus::Member);

        let outcome = env
            .engine
            .resolve_at(REQUESTER, &public_payload(), now())
            .await
            .unwrap();

        assert!(matches!(outcome, DeliveryOutcome::LinkIssued { .. }));
        assert_eq!(env.platform.membership_probes(), 2);
    }

    #[tokio::test]
    async fn non_member_is_asked_to_join() {
        let env = gated_env().await;
        env.platform
            .set_member(FSUB_CHANNEL, BOT, MemberStatus::Administrator);
        env.platform.set_invite_link("https://t.me/+invite");

        let outcome = env
            .engine
            .resolve_at(REQUESTER, &public_payload(), now())
            .await
            .unwrap();

        assert_eq!(outcome, DeliveryOutcome::rejected(Rejection::NeedsJoin));
        let (text, opts) = env.platform.sent_to(chat(REQUESTER)).pop().unwrap();
        assert_eq!(text, FailureKind::NeedsJoin.user_message());
        assert_eq!(
            opts.reply_markup,
            Some(
                ButtonLayout::single(Button::url(
                    messages::JOIN_CHANNEL_BUTTON,
                    "https://t.me/+invite"
                ))
                .row(vec![retry()])
            )
        );
        assert_eq!(env.views_today().await, 0);
    }

    #[tokio::test]
    async fn missing_invite_link_still_offers_retry() {
        let env = gated_env().await;
        env.platform
            .set_member(FSUB_CHANNEL, BOT, MemberStatus::Administrator);
        env.platform
            .set_member(FSUB_CHANNEL, REQUESTER, MemberStatus::Left);

        env.engine
            .resolve_at(REQUESTER, &public_payload(), now())
            .await
            .unwrap();

        assert_eq!(
            env.platform.last_markup_to(chat(REQUESTER)),
            Some(ButtonLayout::single(retry()))
        );
    }

    #[tokio::test]
    async fn unusable_channel_is_cleared_and_owner_told() {
        let env = gated_env().await;
        env.platform
            .set_member_error(FSUB_CHANNEL, BOT, Fail::ChatNotFound);

        let outcome = env
            .engine
            .resolve_at(REQUESTER, &public_payload(), now())
            .await
            .unwrap();

        assert_eq!(outcome, DeliveryOutcome::rejected(Rejection::ChannelGone));
        assert!(env.owner_settings().await.fsub_channel.is_none());
        assert_eq!(
            env.platform.texts_to(chat(OWNER)),
            vec![messages::fsub_channel_error(FSUB_CHANNEL)]
        );
        assert!(env.platform.sent_to(chat(REQUESTER)).is_empty());
        assert_eq!(env.engine.metrics().snapshot().fsub_self_heals, 1);

        // With the channel gone the next request goes straight through.
        let outcome = env
            .engine
            .resolve_at(REQUESTER, &public_payload(), now())
            .await
            .unwrap();
        assert!(matches!(outcome, DeliveryOutcome::LinkIssued { .. }));
    }

    #[tokio::test]
    async fn bot_removed_from_channel_counts_as_unusable() {
        let env = gated_env().await;
        env.platform
            .set_member(FSUB_CHANNEL, BOT, MemberStatus::Kicked);

        let outcome = env
            .engine
            .resolve_at(REQUESTER, &public_payload(), now())
            .await
            .unwrap();

        assert_eq!(outcome, DeliveryOutcome::rejected(Rejection::ChannelGone));
        assert!(env.owner_settings().await.fsub_channel.is_none());
    }

    #[tokio::test]
    async fn transient_probe_error_leaves_settings_alone() {
        let env = gated_env().await;
        env.platform
            .set_member_error(FSUB_CHANNEL, BOT, Fail::Connection);

        let err = env
            .engine
            .resolve_at(REQUESTER, &public_payload(), now())
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(env.owner_settings().await.fsub_channel, Some(FSUB_CHANNEL));
        assert!(env.platform.texts_to(chat(OWNER)).is_empty());
    }

    #[tokio::test]
    async fn failed_settings_write_still_notifies_owner() {
        let env = gated_env().await;
        env.platform
            .set_member_error(FSUB_CHANNEL, BOT, Fail::ChatNotFound);
        env.faults.fail(StoreOp::UpdateUser);

        let outcome = env
            .engine
            .resolve_at(REQUESTER, &public_payload(), now())
            .await
            .unwrap();

        assert_eq!(outcome, DeliveryOutcome::rejected(Rejection::ChannelGone));
        assert_eq!(env.owner_settings().await.fsub_channel, Some(FSUB_CHANNEL));
        assert_eq!(
            env.platform.texts_to(chat(OWNER)),
            vec![messages::fsub_channel_error(FSUB_CHANNEL)]
        );
        assert!(env.platform.sent_to(chat(REQUESTER)).is_empty());
    }
}

mod final_get {
    use super::*;

    #[tokio::test]
    async fn each_time_mode_counts_a_view_and_delivers() {
        let env = TestEnv::new();
        env.owner_with_file().await;

        let outcome = env
            .engine
            .resolve_at(REQUESTER, "finalget_5_abc123", now())
            .await
            .unwrap();

        assert_eq!(outcome, DeliveryOutcome::Delivered);
        assert_eq!(env.views_today().await, 1);
        assert_eq!(env.engine.metrics().snapshot().verifications_granted, 0);
    }

    #[tokio::test]
    async fn twelve_hour_mode_announces_verification_once() {
        let env = TestEnv::new();
        env.owner_with_file().await;
        env.update_owner(SettingsUpdate::ShortenerMode(ShortenerMode::TwelveHour))
            .await;

        for _ in 0..2 {
            let outcome = env
                .engine
                .resolve_at(REQUESTER, "finalget_5_abc123", now())
                .await
                .unwrap();
            assert_eq!(outcome, DeliveryOutcome::Delivered);
        }

        assert_eq!(
            env.platform
                .count_text(chat(REQUESTER), messages::VERIFICATION_SUCCESS),
            1
        );
        assert_eq!(env.engine.metrics().snapshot().verifications_granted, 1);
        assert!(
            env.store
                .is_user_verified(REQUESTER, OWNER, now())
                .await
                .unwrap()
        );

        // The public link now skips the shortener.
        let outcome = env
            .engine
            .resolve_at(REQUESTER, &public_payload(), now())
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            DeliveryOutcome::LinkIssued {
                kind: IssuedLink::Direct,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn missing_file_is_rejected_before_bookkeeping() {
        let env = TestEnv::new();
        env.owner_with_file().await;

        let outcome = env
            .engine
            .resolve_at(REQUESTER, "finalget_5_gone", now())
            .await
            .unwrap();

        assert_eq!(outcome, DeliveryOutcome::rejected(Rejection::FileGone));
        assert_eq!(env.views_today().await, 0);
    }

    fn copies_to_requester(env: &TestEnv) -> usize {
        env.platform
            .calls()
            .iter()
            .filter(|call| matches!(call, Call::CopyMessage { chat: to, .. } if *to == chat(REQUESTER)))
            .count()
    }

    #[tokio::test]
    async fn failed_view_write_does_not_block_delivery() {
        for mode in [ShortenerMode::EachTime, ShortenerMode::TwelveHour] {
            let env = TestEnv::new();
            env.owner_with_file().await;
            env.update_owner(SettingsUpdate::ShortenerMode(mode)).await;
            env.faults.fail(StoreOp::RecordDailyView);

            let outcome = env
                .engine
                .resolve_at(REQUESTER, "finalget_5_abc123", now())
                .await
                .unwrap();

            assert_eq!(outcome, DeliveryOutcome::Delivered, "{mode:?}");
            assert_eq!(copies_to_requester(&env), 1, "{mode:?}");
            assert_eq!(env.views_today().await, 0);
        }
    }

    #[tokio::test]
    async fn failed_view_write_keeps_the_new_grant() {
        let env = TestEnv::new();
        env.owner_with_file().await;
        env.update_owner(SettingsUpdate::ShortenerMode(ShortenerMode::TwelveHour))
            .await;
        env.faults.fail(StoreOp::RecordDailyView);

        env.engine
            .resolve_at(REQUESTER, "finalget_5_abc123", now())
            .await
            .unwrap();

        assert!(
            env.store
                .is_user_verified(REQUESTER, OWNER, now())
                .await
                .unwrap()
        );
        assert_eq!(
            env.platform
                .count_text(chat(REQUESTER), messages::VERIFICATION_SUCCESS),
            1
        );
        assert!(
            !env.platform
                .texts_to(chat(REQUESTER))
                .iter()
                .any(|t| t == messages::GENERIC_APOLOGY)
        );
    }
}

mod storage {
    use super::*;

    #[tokio::test]
    async fn unusable_db_channel_alerts_admin() {
        let env = TestEnv::new();
        env.owner_with_file().await;
        env.platform.fail_copies(Fail::PeerIdInvalid);

        let outcome = env
            .engine
            .resolve_at(OWNER, "ownerget_5_abc123", now())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            DeliveryOutcome::rejected(Rejection::StorageUnavailable)
        );
        assert_eq!(
            env.platform.texts_to(chat(OWNER)),
            vec![FailureKind::InvalidRecipientChannel.user_message()]
        );
        let alerts = env.platform.texts_to(chat(ADMIN));
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].contains("-100"));
        assert_eq!(env.engine.metrics().snapshot().admin_alerts, 1);
    }

    #[tokio::test]
    async fn missing_db_channel_alerts_admin() {
        let env = TestEnv::with(
            EngineConfig::default(),
            LinkConfig {
                owner_db_channel: None,
                ..links()
            },
        );
        env.owner_with_file().await;

        let outcome = env
            .engine
            .resolve_at(OWNER, "ownerget_5_abc123", now())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            DeliveryOutcome::rejected(Rejection::StorageUnavailable)
        );
        assert_eq!(env.platform.texts_to(chat(ADMIN)).len(), 1);
        assert!(
            !env.platform
                .calls()
                .iter()
                .any(|c| matches!(c, Call::CopyMessage { .. }))
        );
    }

    #[tokio::test]
    async fn blocked_recipient_is_silent() {
        let env = TestEnv::new();
        env.owner_with_file().await;
        env.platform.fail_copies(Fail::Blocked);

        let outcome = env
            .engine
            .resolve_at(OWNER, "ownerget_5_abc123", now())
            .await
            .unwrap();

        assert_eq!(outcome, DeliveryOutcome::rejected(Rejection::RecipientBlocked));
        assert!(env.platform.texts_to(chat(ADMIN)).is_empty());
        assert!(env.platform.texts_to(chat(OWNER)).is_empty());
    }
}

