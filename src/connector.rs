//! Connector interface and lifecycle driver.
//!
//! A [`Connector`] implements the three provider-specific primitives
//! (validate, test connection, perform sync) plus optional webhook handling.
//! A [`ConnectorInstance`] wraps one connector together with its mutable
//! [`ConnectorConfig`] and enforces the lifecycle state machine around it:
//! initialize → connect → sync ⇄ disconnect, with error reachable from any
//! state.
//!
//! Connect and sync failures are reported the same way: the error is recorded
//! on the config (`status = error`, `error_message`) and returned to the
//! caller as `Err`.

use crate::config::{ConnectorConfig, ConnectorStatus, ConnectorType, SyncResult, WebhookPayload};
use crate::schedule::next_sync_time;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Provider-specific primitives for one external integration.
///
/// Implementations are stateless with respect to the lifecycle — all mutable
/// state (status, retry counters, timestamps) lives in the
/// [`ConnectorInstance`] that owns the config.
///
/// # Example
/// ```no_run
/// use propsync::{Connector, ConnectorConfig, ConnectorType, SyncResult};
/// use async_trait::async_trait;
/// use anyhow::Result;
/// use chrono::Utc;
///
/// struct VendorConnector;
///
/// #[async_trait]
/// impl Connector for VendorConnector {
///     fn connector_type(&self) -> ConnectorType {
///         ConnectorType::MaintenanceVendor
///     }
///
///     fn provider(&self) -> &str {
///         "acme"
///     }
///
///     fn validate_config(&self, config: &ConnectorConfig) -> Result<()> {
///         anyhow::ensure!(
///             config.credentials.contains_key("api_key"),
///             "API key is required"
///         );
///         Ok(())
///     }
///
///     async fn test_connection(&self, _config: &ConnectorConfig) -> Result<()> {
///         // GET the vendor's health endpoint
///         Ok(())
///     }
///
///     async fn perform_sync(&self, _config: &ConnectorConfig) -> Result<SyncResult> {
///         Ok(SyncResult {
///             success: true,
///             records_processed: 0,
///             errors: vec![],
///             duration_ms: 0, // filled by the lifecycle driver
///             timestamp: Utc::now(),
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait Connector: Send + Sync {
    /// Service category this connector integrates.
    fn connector_type(&self) -> ConnectorType;

    /// Concrete vendor name, e.g. "transunion".
    fn provider(&self) -> &str;

    /// Checks that every credential field the provider requires is present.
    ///
    /// Runs synchronously at initialize time, before any network call.
    /// Presence only — field formats are the provider's problem.
    fn validate_config(&self, config: &ConnectorConfig) -> Result<()>;

    /// Verifies the provider is reachable with the configured credentials.
    async fn test_connection(&self, config: &ConnectorConfig) -> Result<()>;

    /// Runs one batch sync against the provider.
    ///
    /// Per-item failures belong in [`SyncResult::errors`] without aborting
    /// the batch; an `Err` means the sync as a whole failed. `duration_ms`
    /// and `timestamp` are overwritten by the lifecycle driver.
    async fn perform_sync(&self, config: &ConnectorConfig) -> Result<SyncResult>;

    /// Processes an inbound async event from the provider.
    ///
    /// The default implementation ignores the event.
    async fn handle_webhook(
        &self,
        _config: &ConnectorConfig,
        payload: &WebhookPayload,
    ) -> Result<()> {
        debug!(event = %payload.event, "Webhook event not handled by connector");
        Ok(())
    }
}

/// One live integration: a [`Connector`] plus its mutable config.
///
/// All lifecycle methods take `&self`; the config sits behind a mutex so the
/// precondition check and the status write in [`sync`](Self::sync) happen
/// under a single lock acquisition. A second `sync()` on the same instance
/// while one is in flight fails the precondition instead of racing.
pub struct ConnectorInstance {
    connector: Arc<dyn Connector>,
    state: Mutex<InstanceState>,
}

struct InstanceState {
    config: ConnectorConfig,
    /// Set by `initialize()` once the config has passed validation.
    ready: bool,
}

impl ConnectorInstance {
    pub fn new(connector: Arc<dyn Connector>, config: ConnectorConfig) -> Self {
        Self {
            connector,
            state: Mutex::new(InstanceState {
                config,
                ready: false,
            }),
        }
    }

    /// Registry key: `{type}_{provider}`.
    pub fn key(&self) -> String {
        format!(
            "{}_{}",
            self.connector.connector_type(),
            self.connector.provider()
        )
    }

    pub fn connector_type(&self) -> ConnectorType {
        self.connector.connector_type()
    }

    /// Snapshot of the current config.
    pub async fn config(&self) -> ConnectorConfig {
        self.state.lock().await.config.clone()
    }

    pub async fn status(&self) -> ConnectorStatus {
        self.state.lock().await.config.status
    }

    /// Flips the operator-level enable toggle. Does not touch `status`.
    pub async fn set_active(&self, active: bool) {
        let mut state = self.state.lock().await;
        state.config.is_active = active;
        state.config.updated_at = Utc::now();
    }

    /// Validates the config and marks the instance ready.
    ///
    /// Does not change `status`; fails when required credential fields are
    /// missing.
    pub async fn initialize(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.connector.validate_config(&state.config)?;
        state.ready = true;
        debug!(id = %state.config.id, "Connector initialized");
        Ok(())
    }

    /// Tests the provider connection and records the outcome.
    ///
    /// Success: `status = connected`, error cleared. Failure: `status =
    /// error`, `error_message` set, and the error is returned.
    pub async fn connect(&self) -> Result<()> {
        let snapshot = {
            let state = self.state.lock().await;
            anyhow::ensure!(state.ready, "Connector not initialized");
            state.config.clone()
        };

        match self.connector.test_connection(&snapshot).await {
            Ok(()) => {
                let mut state = self.state.lock().await;
                state.config.status = ConnectorStatus::Connected;
                state.config.error_message = None;
                state.config.updated_at = Utc::now();
                info!(id = %state.config.id, "Connector connected");
                Ok(())
            }
            Err(e) => {
                let mut state = self.state.lock().await;
                state.config.status = ConnectorStatus::Error;
                state.config.error_message = Some(e.to_string());
                state.config.updated_at = Utc::now();
                warn!(id = %state.config.id, error = %e, "Connection test failed");
                Err(e)
            }
        }
    }

    /// Unconditionally returns to the disconnected state. Idempotent.
    pub async fn disconnect(&self) {
        let mut state = self.state.lock().await;
        state.config.status = ConnectorStatus::Disconnected;
        state.config.updated_at = Utc::now();
        state.ready = false;
        info!(id = %state.config.id, "Connector disconnected");
    }

    /// Runs one sync through the provider.
    ///
    /// Requires the instance to be initialized and connected. On success the
    /// result carries the measured duration and completion timestamp, and the
    /// config records `last_sync`/`next_sync` with the retry counter reset.
    /// On failure `retry_count` increments by exactly one and the error is
    /// returned.
    pub async fn sync(&self) -> Result<SyncResult> {
        let snapshot = {
            let mut state = self.state.lock().await;
            if !state.ready || state.config.status != ConnectorStatus::Connected {
                anyhow::bail!("Connector not ready for sync");
            }
            state.config.status = ConnectorStatus::Syncing;
            state.config.updated_at = Utc::now();
            state.config.clone()
        };

        let started = Instant::now();
        let outcome = self.connector.perform_sync(&snapshot).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let mut state = self.state.lock().await;
        match outcome {
            Ok(mut result) => {
                let now = Utc::now();
                result.duration_ms = duration_ms;
                result.timestamp = now;
                state.config.status = ConnectorStatus::Connected;
                state.config.last_sync = Some(now);
                state.config.next_sync =
                    Some(next_sync_time(state.config.sync_frequency, state.config.last_sync));
                state.config.error_message = None;
                state.config.retry_count = 0;
                state.config.updated_at = now;
                info!(
                    id = %state.config.id,
                    records = result.records_processed,
                    errors = result.errors.len(),
                    duration_ms,
                    "Sync completed"
                );
                Ok(result)
            }
            Err(e) => {
                state.config.status = ConnectorStatus::Error;
                state.config.error_message = Some(e.to_string());
                state.config.retry_count += 1;
                state.config.updated_at = Utc::now();
                warn!(
                    id = %state.config.id,
                    retry_count = state.config.retry_count,
                    error = %e,
                    "Sync failed"
                );
                Err(e)
            }
        }
    }

    /// Dispatches an inbound webhook event to the connector.
    pub async fn handle_webhook(&self, payload: &WebhookPayload) -> Result<()> {
        let snapshot = self.state.lock().await.config.clone();
        self.connector.handle_webhook(&snapshot, payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    /// Scriptable connector for lifecycle tests.
    struct MockConnector {
        fail_connection: AtomicBool,
        fail_sync: AtomicBool,
        /// When set, `perform_sync` blocks until notified.
        gate: Option<Arc<Notify>>,
    }

    impl MockConnector {
        fn new() -> Self {
            Self {
                fail_connection: AtomicBool::new(false),
                fail_sync: AtomicBool::new(false),
                gate: None,
            }
        }

        fn gated(gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        fn connector_type(&self) -> ConnectorType {
            ConnectorType::BackgroundCheck
        }

        fn provider(&self) -> &str {
            "mockprovider"
        }

        fn validate_config(&self, config: &ConnectorConfig) -> Result<()> {
            anyhow::ensure!(
                config.credentials.contains_key("api_key"),
                "API key is required"
            );
            Ok(())
        }

        async fn test_connection(&self, _config: &ConnectorConfig) -> Result<()> {
            if self.fail_connection.load(Ordering::SeqCst) {
                anyhow::bail!("Connection test failed: Service unavailable");
            }
            Ok(())
        }

        async fn perform_sync(&self, _config: &ConnectorConfig) -> Result<SyncResult> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail_sync.load(Ordering::SeqCst) {
                anyhow::bail!("Sync failed");
            }
            Ok(SyncResult {
                success: true,
                records_processed: 0,
                errors: vec![],
                duration_ms: 0,
                timestamp: Utc::now(),
            })
        }
    }

    fn make_instance(connector: MockConnector) -> ConnectorInstance {
        let config = ConnectorConfig::new(
            ConnectorType::BackgroundCheck,
            "mockprovider",
            HashMap::new(),
            HashMap::from([("api_key".to_string(), "k".to_string())]),
        );
        ConnectorInstance::new(Arc::new(connector), config)
    }

    #[tokio::test]
    async fn test_initialize_validates_credentials() {
        let config = ConnectorConfig::new(
            ConnectorType::BackgroundCheck,
            "mockprovider",
            HashMap::new(),
            HashMap::new(), // no api_key
        );
        let instance = ConnectorInstance::new(Arc::new(MockConnector::new()), config);

        let err = instance.initialize().await.unwrap_err();
        assert!(err.to_string().contains("API key is required"));
        // Status untouched by a failed initialize
        assert_eq!(instance.status().await, ConnectorStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_before_initialize_fails() {
        let instance = make_instance(MockConnector::new());
        let err = instance.connect().await.unwrap_err();
        assert!(err.to_string().contains("not initialized"));
    }

    #[tokio::test]
    async fn test_connect_success_and_failure() {
        let connector = MockConnector::new();
        connector.fail_connection.store(true, Ordering::SeqCst);
        let instance = make_instance(connector);
        instance.initialize().await.unwrap();

        let err = instance.connect().await.unwrap_err();
        let config = instance.config().await;
        assert_eq!(config.status, ConnectorStatus::Error);
        assert_eq!(config.error_message.as_deref(), Some(err.to_string().as_str()));

        // Recovery: flip the mock and reconnect
        let instance = make_instance(MockConnector::new());
        instance.initialize().await.unwrap();
        instance.connect().await.unwrap();
        let config = instance.config().await;
        assert_eq!(config.status, ConnectorStatus::Connected);
        assert!(config.error_message.is_none());
    }

    #[tokio::test]
    async fn test_sync_requires_connected() {
        let instance = make_instance(MockConnector::new());
        instance.initialize().await.unwrap();

        let err = instance.sync().await.unwrap_err();
        assert_eq!(err.to_string(), "Connector not ready for sync");
    }

    #[tokio::test]
    async fn test_sync_success_fills_result_and_resets_retries() {
        let instance = make_instance(MockConnector::new());
        instance.initialize().await.unwrap();
        instance.connect().await.unwrap();

        let result = instance.sync().await.unwrap();
        assert!(result.success);
        assert_eq!(result.records_processed, 0);
        assert!(result.errors.is_empty());

        let config = instance.config().await;
        assert_eq!(config.status, ConnectorStatus::Connected);
        assert!(config.last_sync.is_some());
        assert!(config.next_sync.is_some());
        assert_eq!(config.retry_count, 0);
        assert!(config.error_message.is_none());
    }

    #[tokio::test]
    async fn test_sync_failure_increments_retry_and_propagates() {
        let connector = MockConnector::new();
        connector.fail_sync.store(true, Ordering::SeqCst);
        let instance = make_instance(connector);
        instance.initialize().await.unwrap();
        instance.connect().await.unwrap();

        let err = instance.sync().await.unwrap_err();
        assert_eq!(err.to_string(), "Sync failed");

        let config = instance.config().await;
        assert_eq!(config.status, ConnectorStatus::Error);
        assert_eq!(config.error_message.as_deref(), Some("Sync failed"));
        assert_eq!(config.retry_count, 1);
        assert!(config.last_sync.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_sync_is_rejected() {
        let gate = Arc::new(Notify::new());
        let instance = Arc::new(make_instance(MockConnector::gated(Arc::clone(&gate))));
        instance.initialize().await.unwrap();
        instance.connect().await.unwrap();

        let first = {
            let instance = Arc::clone(&instance);
            tokio::spawn(async move { instance.sync().await })
        };

        // Wait until the first sync has claimed the syncing state
        while instance.status().await != ConnectorStatus::Syncing {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }

        let err = instance.sync().await.unwrap_err();
        assert_eq!(err.to_string(), "Connector not ready for sync");

        gate.notify_one();
        let result = first.await.unwrap().unwrap();
        assert!(result.success);
        assert_eq!(instance.status().await, ConnectorStatus::Connected);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let instance = make_instance(MockConnector::new());
        instance.initialize().await.unwrap();
        instance.connect().await.unwrap();

        instance.disconnect().await;
        assert_eq!(instance.status().await, ConnectorStatus::Disconnected);
        instance.disconnect().await;
        assert_eq!(instance.status().await, ConnectorStatus::Disconnected);

        // Ready flag cleared: sync now fails the precondition
        let err = instance.sync().await.unwrap_err();
        assert_eq!(err.to_string(), "Connector not ready for sync");
    }

    #[tokio::test]
    async fn test_default_webhook_is_ignored() {
        let instance = make_instance(MockConnector::new());
        let payload = WebhookPayload {
            event: "unrelated_event".to_string(),
            data: serde_json::json!({}),
            timestamp: Utc::now(),
            source: "mockprovider".to_string(),
        };
        instance.handle_webhook(&payload).await.unwrap();
    }

    #[tokio::test]
    async fn test_key_format() {
        let instance = make_instance(MockConnector::new());
        assert_eq!(instance.key(), "background_check_mockprovider");
    }
}
