//! `POST /v1/chat/completions`.

use super::error::ApiError;
use super::sse;
use super::AppState;
use crate::orchestrator::SamplingParams;
use crate::types::ChatRequest;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) =
        payload.map_err(|e| ApiError::BadRequest(format!("无效的请求格式: {}", e.body_text())))?;
    validate(&req, &state.config.orchestration.exposed_model)?;

    let messages = state
        .resolver
        .prepare(&state.system_prompt, &req.messages)
        .await;
    let params = SamplingParams {
        temperature: req.temperature,
        top_p: req.top_p,
        max_tokens: req.max_tokens,
    };
    tracing::info!(
        messages = req.messages.len(),
        stream = req.stream,
        "chat completion request"
    );

    if req.stream {
        state.metrics.record_stream();
        let turn = state
            .orchestrator
            .stream(messages, params, CancellationToken::new());
        return Ok(sse::sse_response(sse::turn_body(turn, state.metrics.clone())));
    }

    // The handler future is dropped when the client goes away.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let resp = state.orchestrator.complete(messages, params, &cancel).await?;
    Ok(Json(resp).into_response())
}

fn validate(req: &ChatRequest, exposed_model: &str) -> Result<(), ApiError> {
    if req.model.is_empty() {
        return Err(ApiError::BadRequest("缺少model参数".to_string()));
    }
    if req.model != exposed_model {
        return Err(ApiError::BadRequest(format!(
            "不支持的模型，请使用: {}",
            exposed_model
        )));
    }
    if req.messages.is_empty() {
        return Err(ApiError::BadRequest("messages不能为空".to_string()));
    }
    Ok(())
}
