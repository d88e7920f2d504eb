pub mod button;
pub mod config;
pub mod conversation;
pub mod error;
pub mod file;
pub mod grant;
pub mod link;
pub mod outcome;
pub mod settings;
pub mod types;

pub use button::{Button, ButtonAction, ButtonLayout, FooterButton};
pub use config::LinkConfig;
pub use conversation::{Conversation, ConversationState, PROMPT_TIMEOUT_SECS};
pub use error::FailureKind;
pub use file::{BackupPost, FileRecord};
pub use grant::{VERIFICATION_WINDOW_HOURS, VerificationGrant, verification_window};
pub use link::{DeepLinkRequest, FilePayload, LinkError, LinkKind, deep_link_url};
pub use outcome::{DeliveryOutcome, IssuedLink, Rejection};
pub use settings::{OwnerSettings, SettingsUpdate, ShortenerMode};
pub use types::{ChatId, MessageId, UserId};
