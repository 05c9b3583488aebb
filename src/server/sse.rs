//! Server-sent event framing for streamed turns.

use crate::orchestrator::{error_chunk, StreamingTurn};
use crate::telemetry::Metrics;
use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::StreamExt;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;

pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// `data: {json}\n\n`, or `None` when the event cannot be serialized.
pub fn frame<T: Serialize>(event: &T) -> Option<Bytes> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Bytes::from(format!("data: {json}\n\n"))),
        Err(e) => {
            tracing::warn!(error = %e, "failed to serialize SSE event");
            None
        }
    }
}

/// Frames every chunk of `turn`, replaces a worker error with an error chunk
/// and always ends with `[DONE]`.
///
/// Dropping the body drops the turn, which cancels its worker.
pub fn turn_body(
    turn: StreamingTurn,
    metrics: Arc<Metrics>,
) -> impl futures::Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    let StreamingTurn {
        id,
        created,
        model,
        mut chunks,
    } = turn;
    async_stream::stream! {
        let mut sent = 0usize;
        while let Some(item) = chunks.next().await {
            match item {
                Ok(chunk) => {
                    if let Some(bytes) = frame(&chunk) {
                        sent += 1;
                        yield Ok::<Bytes, Infallible>(bytes);
                    }
                }
                Err(e) => {
                    metrics.record_failure();
                    if let Some(bytes) = frame(&error_chunk(&id, created, &model, &e)) {
                        yield Ok(bytes);
                    }
                    break;
                }
            }
        }
        tracing::debug!(turn = %id, chunks = sent, "stream closed");
        yield Ok(Bytes::from_static(DONE_FRAME.as_bytes()));
    }
}

pub fn sse_response<S>(stream: S) -> Response
where
    S: futures::Stream<Item = Result<Bytes, Infallible>> + Send + 'static,
{
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    (headers, Body::from_stream(stream)).into_response()
}
