//! Wires the dispatcher, the handlers and the monitor notifier together.
//!
//! [`start`] spawns two tokio tasks:
//!
//! - **Dispatcher**: long-polls the upstream service and runs one handler
//!   task per update
//! - **Monitor notifier**: re-renders the pinned status message whenever a
//!   handler reports a change
//!
//! The returned [`BotHandle`] stops the dispatcher. The notifier is stopped
//! only after every in-flight handler has finished, so the last change made
//! during the drain still reaches the pinned message. The bot can also stop
//! itself via `/reboot`, which cancels the same token.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    api::ChatApi,
    bot::{Bot, BotSettings},
    dispatch::{DispatchConfig, Dispatcher},
    monitor::{MonitorNotifier, MonitorSignal},
    store::VotingStore,
};

/// Handle for stopping a running bot and waiting until it has drained.
///
/// Cloning is cheap; every clone controls the same bot.
#[derive(Debug, Clone)]
pub struct BotHandle {
    shutdown: CancellationToken,
    stopped: CancellationToken,
}

impl BotHandle {
    /// Asks the bot to stop fetching updates. Idempotent and non-blocking.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Resolves once the dispatcher has drained every in-flight handler and
    /// the notifier has exited. Safe to call from several tasks.
    pub async fn wait(&self) {
        self.stopped.cancelled().await;
    }

    /// True once a stop was requested, by [`stop`](Self::stop) or `/reboot`.
    pub fn is_stopping(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.is_cancelled()
    }
}

/// Loads admins, publishes the command menus and spawns the bot's tasks.
///
/// A failure to fetch the main chat's administrators is logged and the bot
/// runs with the configured admins only.
pub async fn start(
    api: Arc<dyn ChatApi>,
    store: Arc<VotingStore>,
    settings: BotSettings,
    config: DispatchConfig,
) -> BotHandle {
    let shutdown = CancellationToken::new();
    let stopped = CancellationToken::new();
    let signal = MonitorSignal::new();

    let mut bot = Bot::new(
        Arc::clone(&api),
        Arc::clone(&store),
        signal.clone(),
        settings,
        shutdown.clone(),
    );
    if let Err(err) = bot.load_admins().await {
        error!(error = %err, "failed to load chat administrators");
    }
    bot.register_commands().await;

    let notifier_stop = CancellationToken::new();
    let notifier = MonitorNotifier::new(store, Arc::clone(&api), signal);
    let notifier = tokio::spawn(notifier.run(notifier_stop.clone()));

    let dispatcher = Dispatcher::new(api, Arc::new(bot), config);
    {
        let shutdown = shutdown.clone();
        let stopped = stopped.clone();
        tokio::spawn(async move {
            info!("bot started");
            let cursor = dispatcher.run(shutdown).await;
            notifier_stop.cancel();
            if let Err(err) = notifier.await {
                error!(error = %err, "monitor notifier task failed");
            }
            info!(cursor, "bot stopped");
            stopped.cancel();
        });
    }

    BotHandle { shutdown, stopped }
}
