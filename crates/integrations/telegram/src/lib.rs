//! Telegram Bot API client for stashlink.
//!
//! [`TelegramClient`] implements the [`Platform`](stashlink_platform::Platform)
//! trait over the HTTPS Bot API, translating Bot API error descriptions into
//! typed [`PlatformError`](stashlink_platform::PlatformError)s.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use stashlink_telegram::{TelegramClient, TelegramConfig};
//!
//! let client = TelegramClient::new(TelegramConfig::new("123456:bot-token"));
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::TelegramClient;
pub use config::TelegramConfig;
pub use error::TelegramError;
