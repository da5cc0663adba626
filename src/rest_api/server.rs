//! Axum HTTP server for the REST API

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::metrics::MetricsRegistry;
use crate::options::DrainDirectives;
use crate::state::State;
use crate::{Error, Result};

use super::handlers;

/// Shared state of the HTTP handlers
#[derive(Clone, Debug)]
pub struct ApiState {
    pub state: Arc<State>,
    pub drain: DrainDirectives,
    /// Registry the state metrics were registered in
    pub registry: &'static MetricsRegistry,
}

pub fn router(api: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .route("/state", get(handlers::state))
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(api)
}

/// Run the REST API server until `shutdown` completes
pub async fn run_server<F>(api: ApiState, addr: SocketAddr, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::ConfigError(format!("Failed to bind to {}: {}", addr, e)))?;

    info!("REST API server listening on {}", addr);

    axum::serve(listener, router(api))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::ConfigError(format!("Server error: {}", e)))?;

    Ok(())
}
