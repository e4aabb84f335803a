//! Long-polling ingestion loop.
//!
//! On every tick the dispatcher fetches a batch of updates at the current
//! cursor, spawns one tracked task per update and moves the cursor past the
//! last update of the batch. Fetch failures leave the cursor where it was and
//! are retried on the next tick. When the stop token fires the loop stops
//! fetching and waits for every in-flight handler before returning.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{
    select,
    time::{MissedTickBehavior, interval},
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error, info};

use crate::api::{ChatApi, Update};

/// Per-update application logic. Each call runs in its own task.
#[async_trait]
pub trait UpdateHandler: Send + Sync + 'static {
    async fn handle(&self, update: Update);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    pub poll_interval: Duration,
    pub limit: u32,
    /// Cursor of the first fetch.
    pub offset: i64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            limit: 100,
            offset: 0,
        }
    }
}

pub struct Dispatcher<H> {
    api: Arc<dyn ChatApi>,
    handler: Arc<H>,
    config: DispatchConfig,
    in_flight: TaskTracker,
}

impl<H: UpdateHandler> Dispatcher<H> {
    pub fn new(api: Arc<dyn ChatApi>, handler: Arc<H>, config: DispatchConfig) -> Self {
        Self {
            api,
            handler,
            config,
            in_flight: TaskTracker::new(),
        }
    }

    /// Polls until `shutdown` fires, then drains in-flight handlers.
    /// Returns the cursor the next run should start from.
    pub async fn run(self, shutdown: CancellationToken) -> i64 {
        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cursor = self.config.offset;

        loop {
            select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    cursor = self.poll_once(cursor).await;
                }
            }
        }

        info!(in_flight = self.in_flight.len(), "waiting for processing to finish");
        self.in_flight.close();
        self.in_flight.wait().await;
        info!(cursor, "processing finished");
        cursor
    }

    /// Fetches one batch at `cursor` and dispatches it. Returns the new cursor.
    pub async fn poll_once(&self, cursor: i64) -> i64 {
        let updates = match self.api.updates(self.config.limit, cursor).await {
            Ok(updates) => updates,
            Err(err) => {
                error!(error = %err, cursor, "error getting updates");
                return cursor;
            }
        };

        let Some(last) = updates.last().map(|update| update.update_id) else {
            return cursor;
        };

        info!(count = updates.len(), "fetched updates");
        for update in updates {
            self.dispatch(update);
        }
        last + 1
    }

    fn dispatch(&self, update: Update) {
        debug!(update_id = update.update_id, "dispatching update");
        let handler = Arc::clone(&self.handler);
        self.in_flight.spawn(async move {
            handler.handle(update).await;
        });
    }
}

