//! Per-application access log.

use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Identity of the application a request was served by.
#[derive(Debug, Clone)]
pub struct AccessLog {
    pub app: String,
    pub port: u16,
}

/// Log one line per request. Client errors log at warn, server errors at
/// error.
pub async fn access_log(State(log): State<AccessLog>, request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let response = next.run(request).await;

    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis() as u64;
    if status.is_server_error() {
        tracing::error!(app = %log.app, port = log.port, %method, %path, status = status.as_u16(), elapsed_ms, %request_id, "Request failed");
    } else if status.is_client_error() {
        tracing::warn!(app = %log.app, port = log.port, %method, %path, status = status.as_u16(), elapsed_ms, %request_id, "Request rejected");
    } else {
        tracing::info!(app = %log.app, port = log.port, %method, %path, status = status.as_u16(), elapsed_ms, %request_id, "Request served");
    }

    response
}
