//! Background sync scheduler.
//!
//! Periodically walks the registry and:
//! - syncs active, connected connectors whose `next_sync` is due
//! - reconnects errored connectors while [`should_retry`] allows
//! - deactivates errored connectors once the retry policy vetoes, so a
//!   vetoed connector is never retried again without operator action

use crate::config::ConnectorStatus;
use crate::registry::ConnectorRegistry;
use crate::schedule::{due_for_sync, should_retry};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{info, warn};

pub const DEFAULT_TICK: Duration = Duration::from_secs(30);

/// Drives scheduled syncs for every connector in a registry.
pub struct SyncScheduler {
    registry: Arc<ConnectorRegistry>,
    tick: Duration,
}

impl SyncScheduler {
    pub fn new(registry: Arc<ConnectorRegistry>) -> Self {
        Self::with_tick(registry, DEFAULT_TICK)
    }

    pub fn with_tick(registry: Arc<ConnectorRegistry>, tick: Duration) -> Self {
        Self { registry, tick }
    }

    /// Starts the scheduler loop (non-blocking).
    ///
    /// Returns a JoinHandle used for shutdown; abort it to stop scheduling.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(tick_secs = self.tick.as_secs(), "Sync scheduler started");
            let mut interval = interval(self.tick);
            loop {
                interval.tick().await;
                run_cycle(&self.registry).await;
            }
        })
    }
}

/// One scheduler pass over the registry.
async fn run_cycle(registry: &ConnectorRegistry) {
    let now = Utc::now();
    for instance in registry.get_all().await {
        let config = instance.config().await;
        if !config.is_active {
            continue;
        }

        match config.status {
            ConnectorStatus::Connected => {
                if !due_for_sync(&config, now) {
                    continue;
                }
                if let Err(e) = instance.sync().await {
                    warn!(key = %instance.key(), error = %e, "Scheduled sync failed");
                }
            }
            ConnectorStatus::Error => {
                let message = config.error_message.clone().unwrap_or_default();
                if !should_retry(&message, config.retry_count, config.max_retries) {
                    warn!(
                        key = %instance.key(),
                        retry_count = config.retry_count,
                        error = %message,
                        "Deactivating connector: retry policy vetoed further attempts"
                    );
                    instance.set_active(false).await;
                    continue;
                }
                match instance.connect().await {
                    Ok(()) => info!(key = %instance.key(), "Reconnected errored connector"),
                    Err(e) => {
                        warn!(key = %instance.key(), error = %e, "Reconnect attempt failed")
                    }
                }
            }
            _ => {}
        }
    }
}
