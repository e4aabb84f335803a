use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use group_poll_bot::{
    api::TelegramClient,
    cli::Cli,
    runtime,
    store::{JsonDir, VotingStore},
    telemetry,
};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    telemetry::init_tracing(cli.env, &cli.log_path)?;

    let snapshots = JsonDir::open(&cli.storage)
        .with_context(|| format!("failed to open storage at {}", cli.storage.display()))?;
    let store = VotingStore::open(Box::new(snapshots)).context("failed to load voting store")?;
    let client = TelegramClient::new(&cli.api_url, &cli.token, cli.request_timeout())
        .context("failed to build api client")?;

    let bot = runtime::start(
        Arc::new(client),
        Arc::new(store),
        cli.bot_settings(),
        cli.dispatch_config(),
    )
    .await;

    tokio::select! {
        _ = bot.wait() => {
            warn!("bot stopped on its own");
            return Ok(());
        }
        result = terminated() => {
            result?;
            info!("shutdown requested");
        }
    }

    bot.stop();
    bot.wait().await;
    info!("bye");
    Ok(())
}

#[cfg(unix)]
async fn terminated() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate()).context("failed to listen for SIGTERM")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("failed to listen for ctrl-c"),
        _ = sigterm.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn terminated() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")
}
