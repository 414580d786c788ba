//! Connector registry — directory of live connector instances.
//!
//! The registry is an explicitly constructed object, injected into whatever
//! owns connector lifecycles (the API, the scheduler). Tests and multiple
//! independent registries can coexist; there is no process-wide instance.

use crate::config::{ConnectorStatus, ConnectorType, SyncResult};
use crate::connector::ConnectorInstance;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// In-memory directory of connector instances keyed by `{type}_{provider}`.
pub struct ConnectorRegistry {
    connectors: Mutex<HashMap<String, Arc<ConnectorInstance>>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self {
            connectors: Mutex::new(HashMap::new()),
        }
    }

    /// Registers an instance under its `{type}_{provider}` key.
    ///
    /// A later registration for the same key silently replaces the earlier
    /// one.
    pub async fn register(&self, instance: Arc<ConnectorInstance>) {
        let key = instance.key();
        let mut connectors = self.connectors.lock().await;
        if connectors.insert(key.clone(), instance).is_some() {
            info!(key = %key, "Replaced existing connector registration");
        } else {
            info!(key = %key, "Registered connector");
        }
    }

    /// Removes and returns the instance for `(type, provider)`, if present.
    pub async fn remove(
        &self,
        connector_type: ConnectorType,
        provider: &str,
    ) -> Option<Arc<ConnectorInstance>> {
        let key = format!("{}_{}", connector_type, provider);
        self.connectors.lock().await.remove(&key)
    }

    /// Looks up the instance for `(type, provider)`.
    pub async fn get(
        &self,
        connector_type: ConnectorType,
        provider: &str,
    ) -> Option<Arc<ConnectorInstance>> {
        let key = format!("{}_{}", connector_type, provider);
        self.connectors.lock().await.get(&key).cloned()
    }

    /// All registered instances, in no particular order.
    pub async fn get_all(&self) -> Vec<Arc<ConnectorInstance>> {
        self.connectors.lock().await.values().cloned().collect()
    }

    /// All instances of the given type.
    pub async fn get_by_type(&self, connector_type: ConnectorType) -> Vec<Arc<ConnectorInstance>> {
        self.connectors
            .lock()
            .await
            .values()
            .filter(|instance| instance.connector_type() == connector_type)
            .cloned()
            .collect()
    }

    /// All instances currently in the given status.
    pub async fn get_by_status(&self, status: ConnectorStatus) -> Vec<Arc<ConnectorInstance>> {
        let instances = self.get_all().await;
        let mut matching = Vec::new();
        for instance in instances {
            if instance.status().await == status {
                matching.push(instance);
            }
        }
        matching
    }

    /// Initializes every registered connector concurrently.
    ///
    /// A failure in one connector is logged and does not abort the others.
    pub async fn initialize_all(&self) {
        let instances = self.get_all().await;
        let results = join_all(instances.iter().map(|instance| async move {
            (instance.key(), instance.initialize().await)
        }))
        .await;

        for (key, result) in results {
            if let Err(e) = result {
                warn!(key = %key, error = %e, "Failed to initialize connector");
            }
        }
    }

    /// Syncs every connected connector, one at a time.
    ///
    /// Connectors not in connected status are skipped. A failing sync is
    /// converted into a failed [`SyncResult`] so the batch always runs to
    /// completion; the returned list holds one result per attempted
    /// connector, in attempt order.
    pub async fn sync_all(&self) -> Vec<SyncResult> {
        let instances = self.get_all().await;
        let mut results = Vec::new();

        for instance in instances {
            if instance.status().await != ConnectorStatus::Connected {
                continue;
            }
            match instance.sync().await {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(key = %instance.key(), error = %e, "Sync failed during sync-all");
                    results.push(SyncResult::failure(e.to_string()));
                }
            }
        }

        results
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
