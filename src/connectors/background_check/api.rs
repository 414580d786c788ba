//! HTTP client for background-check provider APIs.
//!
//! All supported providers expose the same screening surface: a `/health`
//! probe, `POST /background-checks` to open a screening, and
//! `GET /background-checks/{id}` to read results. The base URL is selected
//! per provider; unknown providers fall back to a generic placeholder.

use anyhow::{anyhow, Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::store::ScreeningRequest;

pub const TRANSUNION_BASE_URL: &str = "https://api.transunion.com/screening/v1";
pub const EXPERIAN_BASE_URL: &str = "https://api.experian.com/screening/v1";
pub const CHECKR_BASE_URL: &str = "https://api.checkr.com/v1";
/// Placeholder for providers without a dedicated base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.screening.example.com/v1";

/// Base URL for a provider, falling back to [`DEFAULT_BASE_URL`].
pub fn provider_base_url(provider: &str) -> &'static str {
    match provider {
        "transunion" => TRANSUNION_BASE_URL,
        "experian" => EXPERIAN_BASE_URL,
        "checkr" => CHECKR_BASE_URL,
        _ => DEFAULT_BASE_URL,
    }
}

/// One criminal-record entry in a provider report.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriminalRecord {
    pub offense: String,
    #[serde(default)]
    pub jurisdiction: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Employment-history verification entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmploymentRecord {
    pub employer: String,
    pub verified: bool,
    #[serde(default)]
    pub position: Option<String>,
}

/// Reference-check entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceCheck {
    pub name: String,
    pub verified: bool,
}

/// Raw screening results as returned by a provider.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResults {
    #[serde(default)]
    pub criminal_records: Vec<CriminalRecord>,
    #[serde(default)]
    pub credit_score: Option<u32>,
    #[serde(default)]
    pub employment_verification: Vec<EmploymentRecord>,
    #[serde(default)]
    pub reference_checks: Vec<ReferenceCheck>,
}

/// Response to `POST /background-checks`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitCheckResponse {
    pub request_id: String,
}

/// Response to `GET /background-checks/{id}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckStatusResponse {
    pub request_id: String,
    /// Provider-side state, e.g. "processing" or "completed".
    pub status: String,
    #[serde(default)]
    pub results: Option<CheckResults>,
}

/// Outbound payload for `POST /background-checks`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitCheckPayload<'a> {
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    package: &'a str,
}

/// HTTP client for one provider's screening API.
///
/// Authenticates with `Authorization: Bearer {api_key}`; providers that issue
/// a secret (TransUnion) additionally get `X-API-Secret` on every call.
pub struct ProviderClient {
    api_key: String,
    api_secret: Option<String>,
    http_client: Client,
    base_url: String,
}

impl ProviderClient {
    /// Creates a client using the provider's table base URL.
    pub fn new(provider: &str, api_key: String, api_secret: Option<String>) -> Self {
        Self::with_base_url(api_key, api_secret, provider_base_url(provider).to_string())
    }

    /// Creates a client with a custom base URL (for testing with a mock
    /// server).
    pub fn with_base_url(api_key: String, api_secret: Option<String>, base_url: String) -> Self {
        let http_client = Client::builder()
            .user_agent("propsync-connector/1.0")
            .build()
            .expect("Failed to build HTTP client");
        Self {
            api_key,
            api_secret,
            http_client,
            base_url,
        }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.bearer_auth(&self.api_key);
        match &self.api_secret {
            Some(secret) => builder.header("X-API-Secret", secret),
            None => builder,
        }
    }

    /// Probes the provider's health endpoint.
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .request(self.http_client.get(&url))
            .send()
            .await
            .context("Failed to send health check request")?;

        if !response.status().is_success() {
            anyhow::bail!("Connection test failed: {}", response.status());
        }
        Ok(())
    }

    /// Opens a screening for one request; returns the provider-assigned
    /// request id.
    pub async fn submit_check(&self, request: &ScreeningRequest) -> Result<String> {
        let (first_name, last_name) = split_name(&request.tenant_name);
        let payload = SubmitCheckPayload {
            first_name,
            last_name,
            email: &request.tenant_email,
            phone: request.tenant_phone.as_deref(),
            package: request.package.as_str(),
        };

        let url = format!("{}/background-checks", self.base_url);
        let response = self
            .request(self.http_client.post(&url))
            .json(&payload)
            .send()
            .await
            .context("Failed to send background check submission")?;

        check_response_status(&response)?;
        let body: SubmitCheckResponse = response
            .json()
            .await
            .context("Failed to parse submission response")?;
        Ok(body.request_id)
    }

    /// Reads the current status and results of a screening.
    pub async fn fetch_results(&self, request_id: &str) -> Result<CheckStatusResponse> {
        let url = format!("{}/background-checks/{}", self.base_url, request_id);
        let response = self
            .request(self.http_client.get(&url))
            .send()
            .await
            .context("Failed to send results request")?;

        check_response_status(&response)?;
        response
            .json::<CheckStatusResponse>()
            .await
            .context("Failed to parse results response")
    }
}

/// Splits a full name into (first, rest). Single-token names get an empty
/// last name.
fn split_name(full_name: &str) -> (&str, &str) {
    match full_name.split_once(' ') {
        Some((first, rest)) => (first, rest),
        None => (full_name, ""),
    }
}

/// Maps known error codes to descriptive errors.
///
/// The messages carry the phrases the retry policy treats as non-retryable:
/// - 401 → authentication failed
/// - 403 → insufficient permissions
/// - 404 → not found
/// - other non-2xx → generic provider error
fn check_response_status(response: &reqwest::Response) -> Result<()> {
    match response.status() {
        StatusCode::UNAUTHORIZED => Err(anyhow!("Authentication failed: invalid API key")),
        StatusCode::FORBIDDEN => Err(anyhow!("Insufficient permissions for this operation")),
        StatusCode::NOT_FOUND => Err(anyhow!("Not found: unknown screening resource")),
        s if !s.is_success() => Err(anyhow!("Provider API error: {}", s)),
        _ => Ok(()),
    }
}
