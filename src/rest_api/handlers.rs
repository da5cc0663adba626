//! HTTP handlers for the REST API

use axum::{extract::State, http::StatusCode, Json};
use tracing::{error, instrument};

use super::dto::{HealthResponse, ReadyResponse, StateResponse};
use super::server::ApiState;

/// Health check endpoint
#[instrument]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// 200 once the cluster is ready, 503 before
#[instrument(skip(api))]
pub async fn ready(State(api): State<ApiState>) -> (StatusCode, Json<ReadyResponse>) {
    let ready = api.state.is_ready();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(ReadyResponse { ready }))
}

#[instrument(skip(api))]
pub async fn state(State(api): State<ApiState>) -> Json<StateResponse> {
    Json(StateResponse {
        state: api.state.snapshot(),
        drain: api.drain.clone(),
    })
}

/// Metrics endpoint handler
pub async fn metrics(State(api): State<ApiState>) -> Result<String, (StatusCode, String)> {
    api.registry.encode().map_err(|e| {
        error!("Failed to encode metrics: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })
}
