//! Label table endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/labels", get(list_labels))
}

/// GET /labels - class names in model output order.
async fn list_labels(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.gateway.labels().as_slice().to_vec())
}
