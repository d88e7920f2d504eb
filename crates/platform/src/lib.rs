pub mod error;
pub mod platform;
pub mod types;

pub use error::PlatformError;
pub use platform::{DynPlatform, Platform};
pub use types::{
    BotUser, CallbackQuery, IncomingMessage, Media, MemberStatus, ParseMode, SendOptions, Update,
    UpdateKind,
};
