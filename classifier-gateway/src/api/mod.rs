//! Public HTTP API in front of the gateway.

pub mod health;
pub mod labels;
pub mod predict;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::logging::request_logger;
use crate::state::AppState;

/// Build the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(predict::router())
        .merge(labels::router())
        .route("/health", axum::routing::get(health::health))
}

/// Full application: routes, upload limit, logging and CORS.
pub fn app(state: Arc<AppState>) -> Router {
    let max_upload = state.config.api.max_upload_bytes;

    router()
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(middleware::from_fn(request_logger))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
