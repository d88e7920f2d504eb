pub mod adapter;
pub mod error;
pub mod notices;

pub use adapter::{DEFAULT_PROBE_URL, ShortenerAdapter, ShortenerConfig, normalize_domain};
pub use error::ShortenerError;
pub use notices::{NOTICE_INTERVAL, ShortenerNotices};
