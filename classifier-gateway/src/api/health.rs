//! Health check endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use classifier_common::HealthResponse;

use crate::state::AppState;

/// GET /health - probes the model backend.
///
/// 200 `{"status":"ok"}` when the backend reports the model available,
/// 503 otherwise so orchestrators hold traffic back.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let status = state.gateway.check_health().await;
    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(HealthResponse::from(status)))
}
