//! Connector HTTP API.
//!
//! Routes:
//! - `POST /api/connectors` — create, register, and initialize a connector
//! - `GET /api/connectors` — list connector configs (credentials omitted)
//! - `POST /api/connectors/:type/:provider/connect` — connect and activate
//! - `POST /api/connectors/:type/:provider/disconnect` — disconnect and deactivate
//! - `POST /api/connectors/:type/:provider/sync` — run one sync
//! - `POST /api/connectors/sync-all` — sync every connected connector
//! - `DELETE /api/connectors/:type/:provider` — disconnect and remove
//! - `POST /api/webhooks/:type/:provider` — inbound provider webhook
//! - `POST /api/screenings` — enqueue a screening request
//! - `GET /api/screenings/pending` — list requests awaiting submission

use crate::config::{ConnectorConfig, ConnectorType, SyncFrequency, SyncResult, WebhookPayload};
use crate::connector::ConnectorInstance;
use crate::connectors::background_check::store::{
    ScreeningPackage, ScreeningQueue, ScreeningRequest,
};
use crate::connectors::build_connector;
use crate::registry::ConnectorRegistry;
use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared state for the connector API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<ConnectorRegistry>,
    pub queue: Arc<dyn ScreeningQueue>,
}

/// Request body for `POST /api/connectors`.
#[derive(Deserialize)]
pub struct CreateConnectorRequest {
    #[serde(rename = "type")]
    pub connector_type: ConnectorType,
    pub provider: String,
    #[serde(default)]
    pub settings: HashMap<String, String>,
    #[serde(default)]
    pub credentials: HashMap<String, String>,
    pub sync_frequency: Option<SyncFrequency>,
}

/// Response for `POST /api/connectors`.
#[derive(Serialize)]
pub struct CreateConnectorResponse {
    pub id: String,
}

/// Request body for `POST /api/screenings`.
#[derive(Deserialize)]
pub struct CreateScreeningRequest {
    pub tenant_id: String,
    pub tenant_name: String,
    pub tenant_email: String,
    #[serde(default)]
    pub tenant_phone: Option<String>,
    pub property_id: String,
    pub unit_id: String,
    pub package: ScreeningPackage,
}

/// Response for `POST /api/screenings`.
#[derive(Serialize)]
pub struct CreateScreeningResponse {
    pub id: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ---------------------------------------------------------------------------
// Business logic (called from HTTP handlers and unit tests)
// ---------------------------------------------------------------------------

/// Creates a connector config, builds the concrete connector, initializes
/// it, and registers the instance. Returns the new connector id.
///
/// Initialization runs before registration so a connector with invalid
/// credentials never lands in the registry.
pub async fn handle_create_connector(
    state: &ApiState,
    req: CreateConnectorRequest,
) -> Result<String> {
    let mut config = ConnectorConfig::new(
        req.connector_type,
        &req.provider,
        req.settings,
        req.credentials,
    );
    if let Some(frequency) = req.sync_frequency {
        config.sync_frequency = frequency;
    }
    let id = config.id.clone();

    let connector = build_connector(req.connector_type, &req.provider, Arc::clone(&state.queue))?;
    let instance = Arc::new(ConnectorInstance::new(connector, config));
    instance.initialize().await?;
    state.registry.register(instance).await;

    info!(id = %id, "Connector created");
    Ok(id)
}

/// Disconnects and removes a connector. No-op error if it was never
/// registered.
pub async fn handle_delete_connector(
    state: &ApiState,
    connector_type: ConnectorType,
    provider: &str,
) -> Result<bool> {
    match state.registry.remove(connector_type, provider).await {
        Some(instance) => {
            instance.disconnect().await;
            info!(key = %instance.key(), "Connector removed");
            Ok(true)
        }
        None => Ok(false),
    }
}

// ---------------------------------------------------------------------------
// HTTP handlers
// ---------------------------------------------------------------------------

async fn post_connector(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<CreateConnectorRequest>,
) -> Result<(StatusCode, Json<CreateConnectorResponse>), AppError> {
    let id = handle_create_connector(&state, req)
        .await
        .map_err(AppError::bad_request)?;
    Ok((StatusCode::CREATED, Json(CreateConnectorResponse { id })))
}

async fn list_connectors(State(state): State<Arc<ApiState>>) -> Json<Vec<ConnectorConfig>> {
    let mut configs = Vec::new();
    for instance in state.registry.get_all().await {
        configs.push(instance.config().await);
    }
    configs.sort_by(|a, b| a.id.cmp(&b.id));
    Json(configs)
}

async fn connect_connector(
    State(state): State<Arc<ApiState>>,
    Path((connector_type, provider)): Path<(String, String)>,
) -> Result<Json<ConnectorConfig>, AppError> {
    let instance = lookup(&state, &connector_type, &provider).await?;
    instance.connect().await.map_err(AppError::from)?;
    instance.set_active(true).await;
    Ok(Json(instance.config().await))
}

async fn disconnect_connector(
    State(state): State<Arc<ApiState>>,
    Path((connector_type, provider)): Path<(String, String)>,
) -> Result<Json<ConnectorConfig>, AppError> {
    let instance = lookup(&state, &connector_type, &provider).await?;
    instance.disconnect().await;
    instance.set_active(false).await;
    Ok(Json(instance.config().await))
}

async fn sync_connector(
    State(state): State<Arc<ApiState>>,
    Path((connector_type, provider)): Path<(String, String)>,
) -> Result<Json<SyncResult>, AppError> {
    let instance = lookup(&state, &connector_type, &provider).await?;
    let result = instance.sync().await.map_err(AppError::from)?;
    Ok(Json(result))
}

async fn sync_all(State(state): State<Arc<ApiState>>) -> Json<Vec<SyncResult>> {
    Json(state.registry.sync_all().await)
}

async fn delete_connector(
    State(state): State<Arc<ApiState>>,
    Path((connector_type, provider)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let connector_type = parse_type(&connector_type)?;
    let removed = handle_delete_connector(&state, connector_type, &provider)
        .await
        .map_err(AppError::from)?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(format!(
            "No connector registered for {}/{}",
            connector_type, provider
        )))
    }
}

async fn post_webhook(
    State(state): State<Arc<ApiState>>,
    Path((connector_type, provider)): Path<(String, String)>,
    Json(payload): Json<WebhookPayload>,
) -> Result<StatusCode, AppError> {
    let instance = lookup(&state, &connector_type, &provider).await?;
    instance
        .handle_webhook(&payload)
        .await
        .map_err(AppError::from)?;
    Ok(StatusCode::ACCEPTED)
}

async fn post_screening(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<CreateScreeningRequest>,
) -> Result<(StatusCode, Json<CreateScreeningResponse>), AppError> {
    let request = ScreeningRequest::new(
        &req.tenant_id,
        &req.tenant_name,
        &req.tenant_email,
        req.tenant_phone,
        &req.property_id,
        &req.unit_id,
        req.package,
    );
    let id = request.id.clone();
    state.queue.insert(&request).map_err(AppError::from)?;
    info!(id = %id, tenant_id = %request.tenant_id, "Screening request queued");
    Ok((StatusCode::CREATED, Json(CreateScreeningResponse { id })))
}

async fn list_pending_screenings(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Vec<ScreeningRequest>>, AppError> {
    let pending = state.queue.pending().map_err(AppError::from)?;
    Ok(Json(pending))
}

fn parse_type(raw: &str) -> Result<ConnectorType, AppError> {
    raw.parse::<ConnectorType>().map_err(AppError::bad_request)
}

async fn lookup(
    state: &ApiState,
    connector_type: &str,
    provider: &str,
) -> Result<Arc<ConnectorInstance>, AppError> {
    let connector_type = parse_type(connector_type)?;
    state
        .registry
        .get(connector_type, provider)
        .await
        .ok_or_else(|| {
            AppError::not_found(format!(
                "No connector registered for {}/{}",
                connector_type, provider
            ))
        })
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl AppError {
    fn bad_request(e: impl ToString) -> Self {
        AppError::BadRequest(e.to_string())
    }

    fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorResponse { error: msg })).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/connectors", post(post_connector).get(list_connectors))
        .route("/api/connectors/sync-all", post(sync_all))
        .route(
            "/api/connectors/:type/:provider/connect",
            post(connect_connector),
        )
        .route(
            "/api/connectors/:type/:provider/disconnect",
            post(disconnect_connector),
        )
        .route("/api/connectors/:type/:provider/sync", post(sync_connector))
        .route(
            "/api/connectors/:type/:provider",
            delete(delete_connector),
        )
        .route("/api/webhooks/:type/:provider", post(post_webhook))
        .route(
            "/api/screenings",
            post(post_screening),
        )
        .route("/api/screenings/pending", get(list_pending_screenings))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectorStatus;
    use crate::connectors::background_check::store::SqliteScreeningQueue;

    fn make_state() -> ApiState {
        ApiState {
            registry: Arc::new(ConnectorRegistry::new()),
            queue: Arc::new(SqliteScreeningQueue::new(":memory:").unwrap()),
        }
    }

    fn make_request(provider: &str) -> CreateConnectorRequest {
        CreateConnectorRequest {
            connector_type: ConnectorType::BackgroundCheck,
            provider: provider.to_string(),
            settings: HashMap::new(),
            credentials: HashMap::from([("api_key".to_string(), "test_key".to_string())]),
            sync_frequency: None,
        }
    }

    #[tokio::test]
    async fn test_create_connector_registers_instance() {
        let state = make_state();
        let id = handle_create_connector(&state, make_request("experian"))
            .await
            .unwrap();
        assert!(id.starts_with("background_check_experian_"));

        let instance = state
            .registry
            .get(ConnectorType::BackgroundCheck, "experian")
            .await
            .unwrap();
        assert_eq!(instance.status().await, ConnectorStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_create_connector_rejects_missing_credentials() {
        let state = make_state();
        let mut req = make_request("experian");
        req.credentials.clear();

        let err = handle_create_connector(&state, req).await.unwrap_err();
        assert!(err.to_string().contains("API key is required"));

        // Failed initialization must not leave a registration behind
        assert!(state
            .registry
            .get(ConnectorType::BackgroundCheck, "experian")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_create_connector_rejects_unsupported_type() {
        let state = make_state();
        let mut req = make_request("quickbooks");
        req.connector_type = ConnectorType::Accounting;

        let err = handle_create_connector(&state, req).await.unwrap_err();
        assert!(err.to_string().contains("Unsupported connector type"));
    }

    #[tokio::test]
    async fn test_create_connector_honors_frequency_override() {
        let state = make_state();
        let mut req = make_request("experian");
        req.sync_frequency = Some(SyncFrequency::FiveMinutes);

        handle_create_connector(&state, req).await.unwrap();
        let instance = state
            .registry
            .get(ConnectorType::BackgroundCheck, "experian")
            .await
            .unwrap();
        assert_eq!(
            instance.config().await.sync_frequency,
            SyncFrequency::FiveMinutes
        );
    }

    #[tokio::test]
    async fn test_delete_connector() {
        let state = make_state();
        handle_create_connector(&state, make_request("experian"))
            .await
            .unwrap();

        let removed =
            handle_delete_connector(&state, ConnectorType::BackgroundCheck, "experian")
                .await
                .unwrap();
        assert!(removed);
        assert!(state.registry.get_all().await.is_empty());

        let removed =
            handle_delete_connector(&state, ConnectorType::BackgroundCheck, "experian")
                .await
                .unwrap();
        assert!(!removed);
    }
}
