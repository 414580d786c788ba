//! Connector configuration records.
//!
//! A [`ConnectorConfig`] describes the identity and operational state of one
//! external integration. Configs are created through [`ConnectorConfig::new`]
//! and mutated only by the owning [`ConnectorInstance`](crate::ConnectorInstance)
//! during its lifecycle. The registry is the only source of truth while the
//! process runs; configs are not persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Category of external service a connector integrates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorType {
    BackgroundCheck,
    MaintenanceVendor,
    DocumentStorage,
    PropertyListing,
    Accounting,
    IotDevice,
    EmailSms,
    Webhook,
}

impl ConnectorType {
    /// Wire identifier, as used in connector IDs and API paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorType::BackgroundCheck => "background_check",
            ConnectorType::MaintenanceVendor => "maintenance_vendor",
            ConnectorType::DocumentStorage => "document_storage",
            ConnectorType::PropertyListing => "property_listing",
            ConnectorType::Accounting => "accounting",
            ConnectorType::IotDevice => "iot_device",
            ConnectorType::EmailSms => "email_sms",
            ConnectorType::Webhook => "webhook",
        }
    }

    /// Human-readable label used when building connector display names.
    pub fn label(&self) -> &'static str {
        match self {
            ConnectorType::BackgroundCheck => "background check",
            ConnectorType::MaintenanceVendor => "maintenance vendor",
            ConnectorType::DocumentStorage => "document storage",
            ConnectorType::PropertyListing => "property listing",
            ConnectorType::Accounting => "accounting",
            ConnectorType::IotDevice => "IoT device",
            ConnectorType::EmailSms => "email/SMS",
            ConnectorType::Webhook => "webhook",
        }
    }
}

impl fmt::Display for ConnectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectorType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "background_check" => Ok(ConnectorType::BackgroundCheck),
            "maintenance_vendor" => Ok(ConnectorType::MaintenanceVendor),
            "document_storage" => Ok(ConnectorType::DocumentStorage),
            "property_listing" => Ok(ConnectorType::PropertyListing),
            "accounting" => Ok(ConnectorType::Accounting),
            "iot_device" => Ok(ConnectorType::IotDevice),
            "email_sms" => Ok(ConnectorType::EmailSms),
            "webhook" => Ok(ConnectorType::Webhook),
            other => Err(anyhow::anyhow!("Unknown connector type '{}'", other)),
        }
    }
}

/// Lifecycle state of a connector instance.
///
/// Transitions only through disconnected → connected ⇄ syncing, with error
/// reachable from any state. `Pending` is reserved for async-connect flows
/// and is never set by the current lifecycle code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorStatus {
    Connected,
    Disconnected,
    Error,
    Pending,
    Syncing,
}

impl fmt::Display for ConnectorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectorStatus::Connected => "connected",
            ConnectorStatus::Disconnected => "disconnected",
            ConnectorStatus::Error => "error",
            ConnectorStatus::Pending => "pending",
            ConnectorStatus::Syncing => "syncing",
        };
        f.write_str(s)
    }
}

/// How often a connector's sync should be triggered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncFrequency {
    #[serde(rename = "realtime")]
    Realtime,
    #[serde(rename = "5min")]
    FiveMinutes,
    #[serde(rename = "15min")]
    FifteenMinutes,
    #[serde(rename = "30min")]
    ThirtyMinutes,
    #[serde(rename = "hourly")]
    Hourly,
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "weekly")]
    Weekly,
}

/// Identity and operational state of one external integration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Unique ID, `{type}_{provider}_{millis}`. Immutable after creation.
    pub id: String,
    /// Human-readable label, e.g. "Transunion background check".
    pub name: String,
    /// Service category.
    #[serde(rename = "type")]
    pub connector_type: ConnectorType,
    /// Concrete vendor name, e.g. "transunion".
    pub provider: String,
    /// Lifecycle state. Mutated only by the owning connector instance.
    pub status: ConnectorStatus,
    /// Provider-specific settings (region, account IDs, ...).
    pub settings: HashMap<String, String>,
    /// Secret fields (api_key, api_secret, token, ...). Checked for presence
    /// only, never for format, and never serialized into API responses.
    #[serde(skip_serializing, default)]
    pub credentials: HashMap<String, String>,
    /// Sync schedule policy.
    pub sync_frequency: SyncFrequency,
    /// Completion time of the last successful sync.
    pub last_sync: Option<DateTime<Utc>>,
    /// When the next sync is due.
    pub next_sync: Option<DateTime<Utc>>,
    /// Last failure reason; cleared on successful connect/sync.
    pub error_message: Option<String>,
    /// Consecutive failed syncs since the last success.
    pub retry_count: u32,
    /// Retry budget consulted by the scheduling policy.
    pub max_retries: u32,
    /// Operator-level enable toggle, independent of `status`.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConnectorConfig {
    /// Creates a config with framework defaults: disconnected, hourly sync,
    /// three retries, inactive until an operator enables it.
    pub fn new(
        connector_type: ConnectorType,
        provider: &str,
        settings: HashMap<String, String>,
        credentials: HashMap<String, String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: format!("{}_{}_{}", connector_type, provider, now.timestamp_millis()),
            name: format!("{} {}", capitalize(provider), connector_type.label()),
            connector_type,
            provider: provider.to_string(),
            status: ConnectorStatus::Disconnected,
            settings,
            credentials,
            sync_frequency: SyncFrequency::Hourly,
            last_sync: None,
            next_sync: None,
            error_message: None,
            retry_count: 0,
            max_retries: 3,
            is_active: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Registry key shared by all lookups: `{type}_{provider}`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.connector_type, self.provider)
    }
}

/// Outcome of one sync attempt. Immutable once returned.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncResult {
    pub success: bool,
    pub records_processed: u32,
    /// Per-item failure messages, in submission order.
    pub errors: Vec<String>,
    /// Wall-clock duration in milliseconds, filled by the lifecycle driver.
    pub duration_ms: u64,
    /// Completion time, stamped by the lifecycle driver.
    pub timestamp: DateTime<Utc>,
}

impl SyncResult {
    /// Synthesized result for a sync that failed outright.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            records_processed: 0,
            errors: vec![message.into()],
            duration_ms: 0,
            timestamp: Utc::now(),
        }
    }
}

/// Inbound async event from an external provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Event name, e.g. "background_check_completed".
    pub event: String,
    /// Event-specific body.
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    /// Originating system identifier.
    pub source: String,
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
