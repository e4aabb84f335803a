//! Per-update application logic: command and callback handlers.

pub mod callback;
pub mod command;
mod handlers;

use std::{
    collections::HashSet,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    api::{ApiError, ChatApi, Update},
    dispatch::UpdateHandler,
    monitor::MonitorSignal,
    store::{UserId, VotingStore},
};

#[derive(Debug, Clone)]
pub struct BotSettings {
    /// Chat whose administrators are treated as bot admins.
    pub main_chat_id: Option<i64>,
    pub admins: Vec<UserId>,
    /// Minimum uptime before `/reboot` is honoured.
    pub reboot_grace: Duration,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            main_chat_id: None,
            admins: Vec::new(),
            reboot_grace: Duration::from_secs(10),
        }
    }
}

pub struct Bot {
    api: Arc<dyn ChatApi>,
    store: Arc<VotingStore>,
    monitor: MonitorSignal,
    admins: HashSet<UserId>,
    main_chat_id: Option<i64>,
    reboot_grace: Duration,
    started_at: Instant,
    shutdown: CancellationToken,
}

impl Bot {
    /// `shutdown` is cancelled by the `/reboot` command.
    pub fn new(
        api: Arc<dyn ChatApi>,
        store: Arc<VotingStore>,
        monitor: MonitorSignal,
        settings: BotSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            api,
            store,
            monitor,
            admins: settings.admins.into_iter().collect(),
            main_chat_id: settings.main_chat_id,
            reboot_grace: settings.reboot_grace,
            started_at: Instant::now(),
            shutdown,
        }
    }

    /// Adds the main chat's administrators to the configured admins.
    pub async fn load_admins(&mut self) -> Result<(), ApiError> {
        let Some(chat_id) = self.main_chat_id else {
            debug!("no main chat configured, using configured admins only");
            return Ok(());
        };
        let admins = self.api.chat_admins(chat_id).await?;
        self.admins.extend(admins);
        info!(count = self.admins.len(), "admins loaded");
        Ok(())
    }

    /// Publishes the command menus. Failures are logged per scope.
    pub async fn register_commands(&self) {
        for (scope, commands) in command::menus() {
            if let Err(err) = self.api.set_commands(scope, &commands).await {
                error!(error = %err, ?scope, "failed to set commands");
            }
        }
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        self.admins.contains(&user)
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[async_trait]
impl UpdateHandler for Bot {
    async fn handle(&self, update: Update) {
        let update_id = update.update_id;

        if let Some(callback) = update.callback_query.filter(|query| query.data.is_some()) {
            info!(
                update_id,
                from = %callback.from.first_name,
                username = callback.from.handle(),
                data = callback.data.as_deref().unwrap_or_default(),
                "processing callback"
            );
            self.on_callback(callback).await;
            return;
        }

        let Some(message) = update.message else {
            warn!(update_id, "update carries neither a message nor callback data");
            return;
        };

        info!(
            update_id,
            from = message.from.as_ref().map(|user| user.first_name.as_str()).unwrap_or_default(),
            text = message.text.as_deref().unwrap_or_default(),
            date = message.date,
            "processing update"
        );
        self.on_message(message).await;
    }
}
