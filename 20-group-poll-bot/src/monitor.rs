//! Keeps the pinned live-status message in sync with the tally.
//!
//! Handlers raise a [`MonitorSignal`] after every successful mutation. The
//! signal holds at most one pending refresh, so raising it never blocks and
//! bursts of changes collapse into a single edit. A single
//! [`MonitorNotifier`] consumes it until its stop token fires, then applies
//! any refresh still pending.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::{select, sync::Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    api::{ChatApi, InlineKeyboard},
    render,
    store::{NO_VOTE, VotingStore},
};

/// Cloneable, non-blocking "state changed" flag.
#[derive(Debug, Clone, Default)]
pub struct MonitorSignal {
    state: Arc<SignalState>,
}

#[derive(Debug, Default)]
struct SignalState {
    notify: Notify,
    pending: AtomicBool,
}

impl MonitorSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the monitor dirty. Returns immediately whether or not the
    /// consumer is running.
    pub fn raise(&self) {
        self.state.pending.store(true, Ordering::SeqCst);
        self.state.notify.notify_one();
    }

    async fn raised(&self) {
        self.state.notify.notified().await;
    }

    /// Clears the dirty mark, returning whether it was set.
    fn take_pending(&self) -> bool {
        self.state.pending.swap(false, Ordering::SeqCst)
    }
}

pub struct MonitorNotifier {
    store: Arc<VotingStore>,
    api: Arc<dyn ChatApi>,
    signal: MonitorSignal,
}

impl MonitorNotifier {
    pub fn new(store: Arc<VotingStore>, api: Arc<dyn ChatApi>, signal: MonitorSignal) -> Self {
        Self { store, api, signal }
    }

    /// Refreshes the monitor on every raised signal until `shutdown` fires.
    /// A change raised before the stop is still written out.
    pub async fn run(self, shutdown: CancellationToken) {
        debug!("monitor notifier started");
        loop {
            select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = self.signal.raised() => {
                    self.signal.take_pending();
                    self.refresh().await;
                }
            }
        }
        if self.signal.take_pending() {
            debug!("applying pending refresh before stopping");
            self.refresh().await;
        }
        debug!("monitor notifier stopped");
    }

    /// Re-renders the pinned message from the current tally. Failures are
    /// logged and the monitor reference is kept.
    pub async fn refresh(&self) {
        let Some(monitor) = self.store.monitor() else {
            debug!("no monitor set, skipping refresh");
            return;
        };

        let text = render::status(&self.store.tally(false), NO_VOTE);
        if let Err(err) = self
            .api
            .edit_message(
                monitor.chat_id,
                monitor.message_id,
                &text,
                Some(&InlineKeyboard::empty()),
            )
            .await
        {
            warn!(
                error = %err,
                chat_id = monitor.chat_id,
                message_id = monitor.message_id,
                "failed to update monitor"
            );
        }
    }
}
