//! Per-request access logging for the public API.

use std::time::Instant;

use axum::extract::Request;
use axum::http::header::CONTENT_LENGTH;
use axum::middleware::Next;
use axum::response::Response;

/// Middleware logging method, path, status, upload size and latency.
///
/// Server errors (backend outages, deadline hits) log at WARN, client
/// errors at DEBUG, everything else at INFO.
pub async fn request_logger(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let upload_bytes = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match status {
        500..=599 => tracing::warn!(
            %method, %path, status, upload_bytes, elapsed_ms,
            "Request failed"
        ),
        400..=499 => tracing::debug!(
            %method, %path, status, upload_bytes, elapsed_ms,
            "Request rejected"
        ),
        _ => tracing::info!(
            %method, %path, status, upload_bytes, elapsed_ms,
            "Request served"
        ),
    }

    response
}
