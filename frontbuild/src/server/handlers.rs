//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use openapi_server::models::{ErrorResponse, HealthResponse, LaunchResponse};
use serde::Deserialize;
use tracing::error;

use crate::errors::BuildError;
use crate::server::state::ServerState;
use crate::utils::version_info;

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "frontbuild".to_string(),
        version: version.version,
    })
}

/// Launch handler
pub async fn launch_handler(State(state): State<Arc<ServerState>>) -> Response {
    match state.launcher.start().await {
        Ok(job_id) => (StatusCode::ACCEPTED, Json(LaunchResponse { job_id })).into_response(),
        Err(e) => error_response(e),
    }
}

/// Status query parameters
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub job_id: String,
}

/// Status handler
pub async fn status_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<StatusQuery>,
) -> Response {
    match state.reporter.get_status(&query.job_id).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(err: BuildError) -> Response {
    let status = match err {
        BuildError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => {
            error!("Request failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}
