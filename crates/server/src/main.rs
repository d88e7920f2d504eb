use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use stashlink_engine::EngineBuilder;
use stashlink_platform::{DynPlatform, Platform};
use stashlink_server::config::StashlinkConfig;
use stashlink_server::poller::Poller;
use stashlink_store_memory::MemoryStore;
use stashlink_telegram::TelegramClient;

/// Telegram file-store bot.
#[derive(Parser, Debug)]
#[command(name = "stashlink", about = "Telegram file-store bot with deep links")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "stashlink.toml")]
    config: String,

    /// Override the public host used in fast-download links.
    #[arg(long)]
    host: Option<String>,

    /// Override the public port used in fast-download links.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut config = StashlinkConfig::load(&cli.config)?;
    config.apply_env()?;
    if let Some(host) = cli.host {
        config.links.vps_ip = host;
    }
    if let Some(port) = cli.port {
        config.links.vps_port = port;
    }
    config.validate()?;
    info!(config = ?config, "configuration loaded");

    let client = TelegramClient::new(config.bot.telegram());
    let me = Platform::get_me(&client).await?;
    let username = config.bot.username.clone().unwrap_or(me.username);
    let links = config.links.to_link_config(&username);
    if links.owner_db_channel.is_none() {
        warn!("no owner db channel configured; uploads will be refused");
    }

    let platform: Arc<dyn DynPlatform> = Arc::new(client);
    let engine = EngineBuilder::new()
        .store(Arc::new(MemoryStore::new()))
        .platform(Arc::clone(&platform))
        .links(links)
        .bot_id(me.id)
        .shortener_config(config.shortener.to_shortener_config())
        .config(config.engine.to_engine_config())
        .build()?;

    engine.coordinator().start_notice_pruning();

    let cleared = engine.sweep_conversations().await?;
    if cleared > 0 {
        info!(cleared, "cleared conversations left over from a previous run");
    }

    info!(bot = %username, bot_id = %me.id, "stashlink started");

    let poller = Poller::new(
        platform,
        config.bot.poll_timeout_seconds,
        config.bot.retry_delay(),
    );
    poller
        .run(shutdown_signal(), |update| {
            let handler = engine.clone();
            engine.coordinator().spawn(async move {
                handler.handle_update(update).await;
            });
        })
        .await;

    let shutdown_timeout = config.engine.shutdown_timeout();
    info!(
        timeout_secs = shutdown_timeout.as_secs(),
        "waiting for in-flight handlers and backups..."
    );
    if tokio::time::timeout(shutdown_timeout, engine.shutdown())
        .await
        .is_err()
    {
        warn!(
            timeout_secs = shutdown_timeout.as_secs(),
            "shutdown timeout exceeded, some handlers were abandoned"
        );
    }

    info!(metrics = ?engine.metrics().snapshot(), "stashlink shut down");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
