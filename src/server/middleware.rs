//! Admission control and request metrics.

use super::error::ApiError;
use super::AppState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use std::time::Instant;

/// Rejects the request with 429 when the global token bucket is empty.
pub async fn rate_limit(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    if !state.limiter.try_acquire() {
        let snap = state.limiter.snapshot();
        tracing::warn!(
            path = %req.uri().path(),
            wait_ms = ?snap.estimated_wait_ms,
            "rate limit exceeded"
        );
        return ApiError::RateLimited.into_response();
    }
    next.run(req).await
}

/// Counts the request and records its latency under `"{METHOD} {path}"`.
/// Any status of 400 or above counts as failed.
pub async fn track_metrics(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let endpoint = format!("{} {}", req.method(), req.uri().path());
    let start = Instant::now();
    let guard = state.metrics.begin_request();
    let resp = next.run(req).await;
    guard.finish(&endpoint, start.elapsed(), resp.status().as_u16() >= 400);
    resp
}
