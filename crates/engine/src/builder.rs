use std::sync::Arc;

use stashlink_core::{LinkConfig, UserId};
use stashlink_platform::DynPlatform;
use stashlink_shortener::{ShortenerAdapter, ShortenerConfig};
use stashlink_store::Store;

use crate::config::EngineConfig;
use crate::coordinator::Coordinator;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::gate::AccessGate;
use crate::ledger::VerificationLedger;
use crate::metrics::EngineMetrics;
use crate::probe::{HttpProbe, UrlProbe};
use crate::routing::Router;

/// Fluent builder for constructing an [`Engine`].
///
/// A store, a platform, the link configuration, and the bot's own user id
/// must be supplied. Everything else has a default.
pub struct EngineBuilder {
    store: Option<Arc<dyn Store>>,
    platform: Option<Arc<dyn DynPlatform>>,
    links: Option<LinkConfig>,
    bot_id: Option<UserId>,
    shortener_config: ShortenerConfig,
    probe: Option<Arc<dyn UrlProbe>>,
    config: EngineConfig,
    router: Router,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            platform: None,
            links: None,
            bot_id: None,
            shortener_config: ShortenerConfig::default(),
            probe: None,
            config: EngineConfig::default(),
            router: Router::standard(),
        }
    }

    #[must_use]
    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn platform(mut self, platform: Arc<dyn DynPlatform>) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Host, port, bot username, admin, and owner-db channel, read once at
    /// start-up.
    #[must_use]
    pub fn links(mut self, links: LinkConfig) -> Self {
        self.links = Some(links);
        self
    }

    /// The bot's own account id, used for membership probes.
    #[must_use]
    pub fn bot_id(mut self, bot_id: UserId) -> Self {
        self.bot_id = Some(bot_id);
        self
    }

    #[must_use]
    pub fn shortener_config(mut self, config: ShortenerConfig) -> Self {
        self.shortener_config = config;
        self
    }

    /// Replace the HTTP link checker.
    #[must_use]
    pub fn probe(mut self, probe: Arc<dyn UrlProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the dispatch table. It is validated by [`build`](Self::build).
    #[must_use]
    pub fn router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    /// Consume the builder and produce an [`Engine`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] if a required component is
    /// missing and [`EngineError::Routing`] if the dispatch table is invalid.
    pub fn build(self) -> Result<Engine, EngineError> {
        let store = self
            .store
            .ok_or_else(|| EngineError::Configuration("store is required".into()))?;
        let platform = self
            .platform
            .ok_or_else(|| EngineError::Configuration("platform is required".into()))?;
        let links = self
            .links
            .ok_or_else(|| EngineError::Configuration("link config is required".into()))?;
        let bot_id = self
            .bot_id
            .ok_or_else(|| EngineError::Configuration("bot id is required".into()))?;

        if links.bot_username.trim_start_matches('@').is_empty() {
            return Err(EngineError::Configuration(
                "bot username must not be empty".into(),
            ));
        }

        self.router.validate()?;

        let probe = self
            .probe
            .unwrap_or_else(|| Arc::new(HttpProbe::new(self.config.probe_timeout)));
        let shortener = Arc::new(ShortenerAdapter::new(
            self.shortener_config,
            Arc::clone(&store),
        ));

        Ok(Engine {
            gate: AccessGate::new(Arc::clone(&platform), Arc::clone(&store), bot_id),
            ledger: VerificationLedger::new(Arc::clone(&store)),
            coordinator: Arc::new(Coordinator::new(self.config.notice_interval)),
            store,
            platform,
            shortener,
            probe,
            links: Arc::new(links),
            config: Arc::new(self.config),
            bot_id,
            metrics: Arc::new(EngineMetrics::default()),
            router: Arc::new(self.router),
        })
    }
}
