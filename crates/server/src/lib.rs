//! Process wiring for the stashlink bot: configuration loading and the
//! Bot API long-poll loop.

pub mod config;
pub mod error;
pub mod poller;
