use thiserror::Error;

/// Errors that can occur when starting or running the stashlink bot.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The configuration file could not be parsed.
    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    /// An I/O error (e.g. reading the configuration file).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A Bot API call made outside the engine failed.
    #[error("platform error: {0}")]
    Platform(#[from] stashlink_platform::PlatformError),

    /// The engine could not be built.
    #[error("engine error: {0}")]
    Engine(#[from] stashlink_engine::EngineError),
}
