//! Request pipeline for the stashlink file-store bot.
//!
//! The [`Engine`] turns inbound updates into platform calls: it resolves
//! deep links through the force-subscribe gate, the owner's shortener, and
//! the verification ledger, copies stored files to requesters, runs backup
//! jobs, and drives settings conversations.
//!
//! # Quick start
//!
//! ```no_run
//! # use std::sync::Arc;
//! # async fn example(
//! #     store: Arc<dyn stashlink_store::Store>,
//! #     platform: Arc<dyn stashlink_platform::DynPlatform>,
//! #     links: stashlink_core::LinkConfig,
//! #     bot_id: stashlink_core::UserId,
//! # ) -> Result<(), stashlink_engine::EngineError> {
//! use stashlink_engine::EngineBuilder;
//!
//! let engine = EngineBuilder::new()
//!     .store(store)
//!     .platform(platform)
//!     .links(links)
//!     .bot_id(bot_id)
//!     .build()?;
//!
//! let outcome = engine.resolve(stashlink_core::UserId::new(9), "get_5_abc123").await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod backup;
pub mod builder;
pub mod caption;
pub mod config;
pub mod coordinator;
mod delivery;
pub mod engine;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod messages;
pub mod metrics;
pub mod probe;
pub mod routing;
pub mod settings;

pub use backup::{BackupJob, BackupRegistry, BackupStatus, BackupTicket};
pub use builder::EngineBuilder;
pub use config::EngineConfig;
pub use coordinator::Coordinator;
pub use engine::Engine;
pub use error::EngineError;
pub use gate::{AccessGate, GateVerdict};
pub use ledger::{Claim, VerificationLedger};
pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use probe::{HttpProbe, ProbeResult, UrlProbe};
pub use routing::Router;
pub use settings::{ConversationStep, Toggle};
