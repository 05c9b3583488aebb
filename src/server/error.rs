//! HTTP error responses.
//!
//! Every error leaves the gateway as
//! `{"error": {"message": ..., "type": ..., "code": ...}}` with the status of
//! its [`StandardErrorCode`].

use crate::error_code::StandardErrorCode;
use crate::Error;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::any::Any;

pub const RATE_LIMIT_MESSAGE: &str = "请求过于频繁，请稍后再试";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{}", RATE_LIMIT_MESSAGE)]
    RateLimited,

    #[error("处理请求失败: {0}")]
    Gateway(#[from] Error),
}

impl ApiError {
    pub fn code(&self) -> StandardErrorCode {
        match self {
            ApiError::BadRequest(_) => StandardErrorCode::InvalidRequest,
            ApiError::RateLimited => StandardErrorCode::RateLimited,
            ApiError::Gateway(e) => StandardErrorCode::from_error(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code();
        match &self {
            ApiError::Gateway(e) => tracing::error!(error = %e, code = code.code(), "request failed"),
            other => tracing::debug!(error = %other, code = code.code(), "request rejected"),
        }
        error_response(code, self.to_string())
    }
}

pub fn error_response(code: StandardErrorCode, message: impl Into<String>) -> Response {
    let status =
        StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = json!({
        "error": {
            "message": message.into(),
            "type": code.name(),
            "code": code.code(),
        }
    });
    (status, Json(body)).into_response()
}

/// Response used by the catch-panic layer.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "handler panicked");
    error_response(StandardErrorCode::Internal, "internal server error")
}
