//! Background-check connector.
//!
//! Integrates tenant-screening providers (TransUnion, Experian, Checkr).
//! Sync drains the pending screening queue and submits each request to the
//! provider; results arrive asynchronously through the
//! `background_check_completed` webhook, where they are scored and attached
//! to the originating request.

pub mod api;
pub mod scoring;
pub mod store;

use crate::config::{ConnectorConfig, ConnectorType, SyncResult, WebhookPayload};
use crate::connector::Connector;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use self::api::{provider_base_url, CheckResults, CheckStatusResponse, ProviderClient};
use self::scoring::{overall_score, risk_level};
use self::store::{ScreeningPackage, ScreeningQueue, ScreeningReport};

/// Webhook event name signalling a finished screening.
pub const COMPLETED_EVENT: &str = "background_check_completed";

/// Screening tiers every supported provider offers.
pub const SUPPORTED_PACKAGES: [ScreeningPackage; 3] = [
    ScreeningPackage::Standard,
    ScreeningPackage::Premium,
    ScreeningPackage::Express,
];

/// Body of a `background_check_completed` webhook event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletedEvent {
    request_id: String,
    results: CheckResults,
}

/// Connector for one background-check provider.
pub struct BackgroundCheckConnector {
    provider: String,
    base_url: String,
    queue: Arc<dyn ScreeningQueue>,
}

impl BackgroundCheckConnector {
    /// Creates a connector using the provider's table base URL.
    pub fn new(provider: &str, queue: Arc<dyn ScreeningQueue>) -> Self {
        Self {
            provider: provider.to_string(),
            base_url: provider_base_url(provider).to_string(),
            queue,
        }
    }

    /// Creates a connector with a custom base URL (for testing).
    pub fn with_base_url(provider: &str, queue: Arc<dyn ScreeningQueue>, base_url: String) -> Self {
        Self {
            provider: provider.to_string(),
            base_url,
            queue,
        }
    }

    /// Builds a provider client from the config's credentials.
    ///
    /// A `base_url` entry in the config's settings overrides the provider
    /// table (sandbox endpoints, mock servers).
    fn client(&self, config: &ConnectorConfig) -> Result<ProviderClient> {
        let api_key = config
            .credentials
            .get("api_key")
            .context("API key is required for background check connectors")?;
        let api_secret = config.credentials.get("api_secret").cloned();
        let base_url = config
            .settings
            .get("base_url")
            .cloned()
            .unwrap_or_else(|| self.base_url.clone());
        Ok(ProviderClient::with_base_url(
            api_key.clone(),
            api_secret,
            base_url,
        ))
    }

    /// Reads the current provider-side status and results of a screening.
    pub async fn fetch_check_results(
        &self,
        config: &ConnectorConfig,
        request_id: &str,
    ) -> Result<CheckStatusResponse> {
        self.client(config)?.fetch_results(request_id).await
    }
}

#[async_trait]
impl Connector for BackgroundCheckConnector {
    fn connector_type(&self) -> ConnectorType {
        ConnectorType::BackgroundCheck
    }

    fn provider(&self) -> &str {
        &self.provider
    }

    fn validate_config(&self, config: &ConnectorConfig) -> Result<()> {
        anyhow::ensure!(
            config.credentials.contains_key("api_key"),
            "API key is required for background check connectors"
        );
        // TransUnion issues a key/secret pair; the secret rides along as
        // X-API-Secret on every call.
        if self.provider == "transunion" {
            anyhow::ensure!(
                config.credentials.contains_key("api_secret"),
                "API secret is required for provider 'transunion'"
            );
        }
        Ok(())
    }

    async fn test_connection(&self, config: &ConnectorConfig) -> Result<()> {
        self.client(config)?.health_check().await
    }

    async fn perform_sync(&self, config: &ConnectorConfig) -> Result<SyncResult> {
        let pending = self
            .queue
            .pending()
            .context("Failed to fetch pending screening requests")?;
        let client = self.client(config)?;

        let mut processed = 0u32;
        let mut errors = Vec::new();

        for request in &pending {
            match client.submit_check(request).await {
                Ok(provider_request_id) => {
                    self.queue.mark_submitted(&request.id, &provider_request_id)?;
                    processed += 1;
                }
                Err(e) => {
                    // Partial-failure semantics: one bad request does not
                    // block the rest of the batch.
                    warn!(
                        request_id = %request.id,
                        provider = %self.provider,
                        error = %e,
                        "Failed to submit screening request"
                    );
                    errors.push(format!("{}: {}", request.id, e));
                }
            }
        }

        Ok(SyncResult {
            success: errors.is_empty(),
            records_processed: processed,
            errors,
            duration_ms: 0,
            timestamp: Utc::now(),
        })
    }

    async fn handle_webhook(
        &self,
        _config: &ConnectorConfig,
        payload: &WebhookPayload,
    ) -> Result<()> {
        if payload.event != COMPLETED_EVENT {
            tracing::debug!(event = %payload.event, "Ignoring unhandled webhook event");
            return Ok(());
        }

        let event: CompletedEvent = serde_json::from_value(payload.data.clone())
            .context("Malformed background_check_completed payload")?;

        let score = overall_score(&event.results);
        let level = risk_level(score);
        let report = ScreeningReport {
            overall_score: score,
            risk_level: level,
            results: event.results,
            completed_at: Utc::now(),
        };
        self.queue.complete(&event.request_id, &report)?;

        info!(
            request_id = %event.request_id,
            score,
            risk = %level,
            "Background check completed"
        );
        Ok(())
    }
}
