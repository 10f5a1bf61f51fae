//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::errors::BuildError;
use crate::server::handlers::{health_handler, launch_handler, status_handler};
use crate::server::state::ServerState;
use crate::storage::settings::ServerSettings;

/// Build the router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/jobs", post(launch_handler))
        .route("/jobs/status", get(status_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve until `shutdown_signal` resolves
pub async fn serve(
    settings: &ServerSettings,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), BuildError> {
    let addr = format!("{}:{}", settings.host, settings.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| BuildError::ConfigError(format!("Unable to bind {}: {}", addr, e)))?;

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal)
        .await?;
    Ok(())
}
