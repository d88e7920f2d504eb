//! Shared fixtures for engine integration tests.
//!
//! [`RecordingPlatform`] answers every call from in-memory state and keeps a
//! log of what the engine asked for, so tests can assert on outgoing
//! messages without a network.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use stashlink_core::{
    BackupPost, ButtonLayout, ChatId, Conversation, FilePayload, FileRecord, LinkConfig,
    MessageId, OwnerSettings, SettingsUpdate, UserId,
};
use stashlink_engine::{Engine, EngineBuilder, EngineConfig, ProbeResult, UrlProbe};
use stashlink_platform::{
    BotUser, IncomingMessage, Media, MemberStatus, Platform, PlatformError, SendOptions, Update,
};
use stashlink_shortener::ShortenerConfig;
use stashlink_store::{Store, StoreError};
use stashlink_store_memory::MemoryStore;

pub const ADMIN: UserId = UserId::new(1);
pub const OWNER: UserId = UserId::new(5);
pub const REQUESTER: UserId = UserId::new(9);
pub const BOT: UserId = UserId::new(42);
pub const DB_CHANNEL: ChatId = ChatId::new(-100);
pub const FSUB_CHANNEL: ChatId = ChatId::new(-200);
pub const FILE_ID: &str = "abc123";

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

pub fn links() -> LinkConfig {
    LinkConfig {
        vps_ip: "10.0.0.1".into(),
        vps_port: 7071,
        bot_username: "StashBot".into(),
        admin_id: ADMIN,
        owner_db_channel: Some(DB_CHANNEL),
    }
}

pub fn chat(user: UserId) -> ChatId {
    ChatId::from(user)
}

/// Failure injected into a platform call. `PlatformError` is not `Clone`, so
/// the fixture stores this instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fail {
    Blocked,
    ChatNotFound,
    PeerIdInvalid,
    NotParticipant,
    Connection,
    Api,
}

impl Fail {
    fn to_error(self) -> PlatformError {
        match self {
            Self::Blocked => PlatformError::UserBlocked,
            Self::ChatNotFound => PlatformError::ChatNotFound,
            Self::PeerIdInvalid => PlatformError::PeerIdInvalid,
            Self::NotParticipant => PlatformError::UserNotParticipant,
            Self::Connection => PlatformError::Connection("connection reset".into()),
            Self::Api => PlatformError::Api("Bad Request: injected".into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SendMessage {
        chat: ChatId,
        text: String,
        opts: SendOptions,
    },
    SendPhoto {
        chat: ChatId,
        photo: String,
        caption: String,
        opts: SendOptions,
    },
    CopyMessage {
        chat: ChatId,
        from: ChatId,
        message: MessageId,
        caption: Option<String>,
        opts: SendOptions,
    },
    SendCachedMedia {
        chat: ChatId,
        file_id: String,
        caption: String,
        opts: SendOptions,
    },
    EditMessage {
        chat: ChatId,
        message: MessageId,
        text: String,
    },
    DeleteMessage {
        chat: ChatId,
        message: MessageId,
    },
    AnswerCallback {
        id: String,
        text: Option<String>,
        alert: bool,
    },
    GetChatMember {
        chat: ChatId,
        user: UserId,
    },
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    members: HashMap<(ChatId, UserId), Result<MemberStatus, Fail>>,
    invite_link: Option<String>,
    send_failures: HashMap<ChatId, Fail>,
    copy_failure: Option<Fail>,
    failing_marker: Option<String>,
    next_id: i64,
}

#[derive(Default)]
pub struct RecordingPlatform {
    state: Mutex<State>,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_member(&self, chat: ChatId, user: UserId, status: MemberStatus) {
        self.state
            .lock()
            .unwrap()
            .members
            .insert((chat, user), Ok(status));
    }

    pub fn set_member_error(&self, chat: ChatId, user: UserId, fail: Fail) {
        self.state
            .lock()
            .unwrap()
            .members
            .insert((chat, user), Err(fail));
    }

    pub fn set_invite_link(&self, link: &str) {
        self.state.lock().unwrap().invite_link = Some(link.to_owned());
    }

    /// Make every message, photo, or media send to `chat` fail.
    pub fn fail_sends_to(&self, chat: ChatId, fail: Fail) {
        self.state.lock().unwrap().send_failures.insert(chat, fail);
    }

    pub fn fail_copies(&self, fail: Fail) {
        self.state.lock().unwrap().copy_failure = Some(fail);
    }

    /// Make sends whose text contains `marker` fail with an API error.
    pub fn fail_text_containing(&self, marker: &str) {
        self.state.lock().unwrap().failing_marker = Some(marker.to_owned());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Text and options of every message sent to `chat`, oldest first.
    pub fn sent_to(&self, chat: ChatId) -> Vec<(String, SendOptions)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SendMessage {
                    chat: c,
                    text,
                    opts,
                } if c == chat => Some((text, opts)),
                _ => None,
            })
            .collect()
    }

    pub fn texts_to(&self, chat: ChatId) -> Vec<String> {
        self.sent_to(chat).into_iter().map(|(text, _)| text).collect()
    }

    pub fn count_text(&self, chat: ChatId, text: &str) -> usize {
        self.texts_to(chat).iter().filter(|t| *t == text).count()
    }

    pub fn last_markup_to(&self, chat: ChatId) -> Option<ButtonLayout> {
        self.sent_to(chat)
            .pop()
            .and_then(|(_, opts)| opts.reply_markup)
    }

    pub fn membership_probes(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::GetChatMember { .. }))
            .count()
    }

    pub fn answers(&self) -> Vec<(Option<String>, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::AnswerCallback { text, alert, .. } => Some((text, alert)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) -> MessageId {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state.next_id += 1;
        MessageId::new(1000 + state.next_id)
    }

    fn send_failure(&self, chat: ChatId, text: &str) -> Option<PlatformError> {
        let state = self.state.lock().unwrap();
        if let Some(fail) = state.send_failures.get(&chat) {
            return Some(fail.to_error());
        }
        state
            .failing_marker
            .as_deref()
            .filter(|marker| text.contains(marker))
            .map(|_| Fail::Api.to_error())
    }
}

impl Platform for RecordingPlatform {
    async fn get_me(&self) -> Result<BotUser, PlatformError> {
        Ok(BotUser {
            id: BOT,
            username: "StashBot".into(),
        })
    }

    async fn get_updates(&self, _: i64, _: u32) -> Result<Vec<Update>, PlatformError> {
        Ok(Vec::new())
    }

    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        opts: &SendOptions,
    ) -> Result<MessageId, PlatformError> {
        if let Some(e) = self.send_failure(chat_id, text) {
            return Err(e);
        }
        Ok(self.record(Call::SendMessage {
            chat: chat_id,
            text: text.to_owned(),
            opts: opts.clone(),
        }))
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: &str,
        caption: &str,
        opts: &SendOptions,
    ) -> Result<MessageId, PlatformError> {
        if let Some(e) = self.send_failure(chat_id, caption) {
            return Err(e);
        }
        Ok(self.record(Call::SendPhoto {
            chat: chat_id,
            photo: photo.to_owned(),
            caption: caption.to_owned(),
            opts: opts.clone(),
        }))
    }

    async fn copy_message(
        &self,
        chat_id: ChatId,
        from_chat_id: ChatId,
        message_id: MessageId,
        caption: Option<&str>,
        opts: &SendOptions,
    ) -> Result<MessageId, PlatformError> {
        if let Some(fail) = self.state.lock().unwrap().copy_failure {
            return Err(fail.to_error());
        }
        Ok(self.record(Call::CopyMessage {
            chat: chat_id,
            from: from_chat_id,
            message: message_id,
            caption: caption.map(str::to_owned),
            opts: opts.clone(),
        }))
    }

    async fn send_cached_media(
        &self,
        chat_id: ChatId,
        file_id: &str,
        caption: &str,
        opts: &SendOptions,
    ) -> Result<MessageId, PlatformError> {
        if let Some(e) = self.send_failure(chat_id, caption) {
            return Err(e);
        }
        Ok(self.record(Call::SendCachedMedia {
            chat: chat_id,
            file_id: file_id.to_owned(),
            caption: caption.to_owned(),
            opts: opts.clone(),
        }))
    }

    async fn edit_message_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        _: &SendOptions,
    ) -> Result<(), PlatformError> {
        self.record(Call::EditMessage {
            chat: chat_id,
            message: message_id,
            text: text.to_owned(),
        });
        Ok(())
    }

    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), PlatformError> {
        self.record(Call::DeleteMessage {
            chat: chat_id,
            message: message_id,
        });
        Ok(())
    }

    async fn get_chat_member(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<MemberStatus, PlatformError> {
        self.record(Call::GetChatMember {
            chat: chat_id,
            user: user_id,
        });
        let state = self.state.lock().unwrap();
        match state.members.get(&(chat_id, user_id)) {
            Some(Ok(status)) => Ok(*status),
            Some(Err(fail)) => Err(fail.to_error()),
            None => Err(PlatformError::UserNotParticipant),
        }
    }

    async fn export_chat_invite_link(&self, _: ChatId) -> Result<String, PlatformError> {
        self.state
            .lock()
            .unwrap()
            .invite_link
            .clone()
            .ok_or(PlatformError::AdminRequired)
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), PlatformError> {
        self.record(Call::AnswerCallback {
            id: callback_id.to_owned(),
            text: text.map(str::to_owned),
            alert: show_alert,
        });
        Ok(())
    }
}

/// Link checker returning a fixed answer and remembering what it was asked.
pub struct StubProbe {
    result: Mutex<ProbeResult>,
    seen: Mutex<Vec<String>>,
}

impl StubProbe {
    pub fn new(result: ProbeResult) -> Self {
        Self {
            result: Mutex::new(result),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn set(&self, result: ProbeResult) {
        *self.result.lock().unwrap() = result;
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl UrlProbe for StubProbe {
    async fn probe(&self, url: &str) -> ProbeResult {
        self.seen.lock().unwrap().push(url.to_owned());
        *self.result.lock().unwrap()
    }
}

/// A shortener API answering every request with the same JSON body.
pub struct MockShortener {
    pub domain: String,
    requests: Arc<AtomicUsize>,
}

impl MockShortener {
    pub async fn start(body: &str) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock server");
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&requests);
        let body = body.to_owned();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = vec![0u8; 8192];
                let _ = stream.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\n\
                     Content-Type: application/json\r\n\
                     Content-Length: {}\r\n\
                     Connection: close\r\n\
                     \r\n\
                     {body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Self {
            domain: format!("127.0.0.1:{port}"),
            requests,
        }
    }

    pub async fn success(short_url: &str) -> Self {
        Self::start(&format!(
            r#"{{"status":"success","shortenedUrl":"{short_url}"}}"#
        ))
        .await
    }

    pub async fn rejecting() -> Self {
        Self::start(r#"{"status":"error","message":["Invalid API key"]}"#).await
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

/// Store operations that [`FaultyStore`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    UpdateUser,
    RecordDailyView,
    GetPostsForBackup,
}

/// Delegates to a [`MemoryStore`], failing the operations switched on with
/// [`fail`](Self::fail).
pub struct FaultyStore {
    inner: Arc<MemoryStore>,
    failing: Mutex<HashSet<StoreOp>>,
}

impl FaultyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail(&self, op: StoreOp) {
        self.failing.lock().unwrap().insert(op);
    }

    fn check(&self, op: StoreOp) -> Result<(), StoreError> {
        if self.failing.lock().unwrap().contains(&op) {
            Err(StoreError::Backend(format!("{op:?} unavailable")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Store for FaultyStore {
    async fn get_user(&self, user_id: UserId) -> Result<Option<OwnerSettings>, StoreError> {
        self.inner.get_user(user_id).await
    }

    async fn add_user(&self, user_id: UserId) -> Result<bool, StoreError> {
        self.inner.add_user(user_id).await
    }

    async fn update_user(
        &self,
        user_id: UserId,
        update: SettingsUpdate,
    ) -> Result<(), StoreError> {
        self.check(StoreOp::UpdateUser)?;
        self.inner.update_user(user_id, update).await
    }

    async fn save_file(&self, record: FileRecord) -> Result<(), StoreError> {
        self.inner.save_file(record).await
    }

    async fn get_file_by_unique_id(
        &self,
        owner_id: UserId,
        file_unique_id: &str,
    ) -> Result<Option<FileRecord>, StoreError> {
        self.inner.get_file_by_unique_id(owner_id, file_unique_id).await
    }

    async fn is_user_verified(
        &self,
        requester_id: UserId,
        owner_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.inner.is_user_verified(requester_id, owner_id, now).await
    }

    async fn claim_verification_for_file(
        &self,
        owner_id: UserId,
        file_unique_id: &str,
        requester_id: UserId,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<bool, StoreError> {
        self.inner
            .claim_verification_for_file(owner_id, file_unique_id, requester_id, now, window)
            .await
    }

    async fn record_daily_view(
        &self,
        owner_id: UserId,
        requester_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.check(StoreOp::RecordDailyView)?;
        self.inner.record_daily_view(owner_id, requester_id, now).await
    }

    async fn daily_views(&self, owner_id: UserId, day: NaiveDate) -> Result<u64, StoreError> {
        self.inner.daily_views(owner_id, day).await
    }

    async fn save_backup_post(&self, post: BackupPost) -> Result<(), StoreError> {
        self.inner.save_backup_post(post).await
    }

    async fn get_posts_for_backup(
        &self,
        owner_id: UserId,
        channel_id: ChatId,
    ) -> Result<Vec<BackupPost>, StoreError> {
        self.check(StoreOp::GetPostsForBackup)?;
        self.inner.get_posts_for_backup(owner_id, channel_id).await
    }

    async fn delete_posts_from_channel(
        &self,
        owner_id: UserId,
        channel_id: ChatId,
    ) -> Result<u64, StoreError> {
        self.inner.delete_posts_from_channel(owner_id, channel_id).await
    }

    async fn save_conversation(&self, conversation: &Conversation) -> Result<(), StoreError> {
        self.inner.save_conversation(conversation).await
    }

    async fn get_conversation(
        &self,
        user_id: UserId,
    ) -> Result<Option<Conversation>, StoreError> {
        self.inner.get_conversation(user_id).await
    }

    async fn clear_conversation(&self, user_id: UserId) -> Result<bool, StoreError> {
        self.inner.clear_conversation(user_id).await
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        self.inner.list_conversations().await
    }
}

pub struct TestEnv {
    pub engine: Engine,
    pub platform: Arc<RecordingPlatform>,
    pub store: Arc<MemoryStore>,
    /// The store the engine actually talks to; wraps `store`.
    pub faults: Arc<FaultyStore>,
    pub probe: Arc<StubProbe>,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with(EngineConfig::default(), links())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with(config, links())
    }

    pub fn with(config: EngineConfig, links: LinkConfig) -> Self {
        let platform = Arc::new(RecordingPlatform::new());
        let store = Arc::new(MemoryStore::new());
        let faults = Arc::new(FaultyStore::new(Arc::clone(&store)));
        let probe = Arc::new(StubProbe::new(ProbeResult::Reachable));

        let engine = EngineBuilder::new()
            .store(Arc::clone(&faults) as Arc<dyn Store>)
            .platform(platform.clone())
            .links(links)
            .bot_id(BOT)
            .shortener_config(ShortenerConfig::default().with_scheme("http"))
            .probe(probe.clone())
            .config(config)
            .build()
            .expect("engine should build");

        Self {
            engine,
            platform,
            store,
            faults,
            probe,
        }
    }

    /// Register the owner and store one file for them.
    pub async fn owner_with_file(&self) -> FilePayload {
        self.store.add_user(OWNER).await.unwrap();
        let record = FileRecord {
            owner_id: OWNER,
            file_unique_id: FILE_ID.into(),
            file_name: "Holiday_Clip.mp4".into(),
            file_id: MessageId::new(31),
            stream_id: MessageId::new(31),
        };
        self.store.save_file(record.clone()).await.unwrap();
        record.payload()
    }

    pub async fn update_owner(&self, update: SettingsUpdate) {
        self.store.update_user(OWNER, update).await.unwrap();
    }

    pub async fn owner_settings(&self) -> OwnerSettings {
        self.store.get_user(OWNER).await.unwrap().unwrap()
    }

    pub async fn views_today(&self) -> u64 {
        self.store
            .daily_views(OWNER, now().date_naive())
            .await
            .unwrap()
    }
}

pub fn text_message(from: UserId, text: &str) -> IncomingMessage {
    IncomingMessage {
        chat_id: ChatId::from(from),
        message_id: MessageId::new(500),
        from: Some(from),
        text: Some(text.to_owned()),
        forward_from_chat: None,
        media: None,
    }
}

pub fn forwarded_from(from: UserId, channel: ChatId) -> IncomingMessage {
    IncomingMessage {
        forward_from_chat: Some(channel),
        text: None,
        ..text_message(from, "")
    }
}

pub fn upload(from: UserId, unique_id: &str, name: &str) -> IncomingMessage {
    IncomingMessage {
        message_id: MessageId::new(77),
        text: None,
        media: Some(Media {
            file_id: format!("BQAD-{unique_id}"),
            file_unique_id: unique_id.to_owned(),
            file_name: Some(name.to_owned()),
        }),
        ..text_message(from, "")
    }
}
