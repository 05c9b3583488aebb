//! 标准错误码：将内部错误映射为对外的错误类型、错误码和 HTTP 状态。
//!
//! Standard error codes for the gateway's wire protocol.
//!
//! Every [`Error`](crate::Error) surfaced to a client is classified into one of
//! these codes. The `name()` is what OpenAI-style clients see in
//! `{"error": {"type": ...}}`; the `code()` is a stable identifier for logs and
//! dashboards.
//!
//! ## Error Code Categories
//!
//! | Prefix | Category    | Description                        |
//! |--------|-------------|------------------------------------|
//! | E1xxx  | client      | Request-side errors                |
//! | E2xxx  | rate        | Admission control                  |
//! | E3xxx  | upstream    | LLM or collaborator failures       |
//! | E4xxx  | operational | Orchestration and lifecycle errors |
//! | E9xxx  | internal    | Catch-all                          |
//!
//! ## Example
//!
//! ```rust
//! use job_chat_gateway::error_code::StandardErrorCode;
//!
//! let code = StandardErrorCode::from_http_status(429);
//! assert_eq!(code.name(), "rate_limit_exceeded");
//! assert!(code.retryable());
//! ```

use crate::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardErrorCode {
    /// E1001: Malformed request, unknown model, or missing required fields
    InvalidRequest,
    /// E1004: Route or resource does not exist
    NotFound,
    /// E2001: Gateway rate limit exceeded
    RateLimited,
    /// E3001: LLM backend or tool collaborator answered with an error
    UpstreamError,
    /// E3003: LLM backend or tool collaborator timed out
    UpstreamTimeout,
    /// E4001: The model did not converge within the tool-call budget
    ToolLoopExhausted,
    /// E4002: Request was cancelled by the client
    Cancelled,
    /// E9999: Anything else
    Internal,
}

impl StandardErrorCode {
    #[inline]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "E1001",
            Self::NotFound => "E1004",
            Self::RateLimited => "E2001",
            Self::UpstreamError => "E3001",
            Self::UpstreamTimeout => "E3003",
            Self::ToolLoopExhausted => "E4001",
            Self::Cancelled => "E4002",
            Self::Internal => "E9999",
        }
    }

    /// Returns the wire error type (e.g., `"invalid_request"`).
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limit_exceeded",
            Self::UpstreamError => "upstream_error",
            Self::UpstreamTimeout => "upstream_timeout",
            Self::ToolLoopExhausted => "tool_loop_exhausted",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal_error",
        }
    }

    #[inline]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest => 400,
            Self::NotFound => 404,
            Self::RateLimited => 429,
            Self::UpstreamError => 502,
            Self::UpstreamTimeout => 504,
            Self::ToolLoopExhausted => 500,
            // nginx convention for "client closed request"
            Self::Cancelled => 499,
            Self::Internal => 500,
        }
    }

    /// Returns whether a call that failed with this code is worth retrying.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::UpstreamError | Self::UpstreamTimeout
        )
    }

    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidRequest | Self::NotFound => "client",
            Self::RateLimited => "rate",
            Self::UpstreamError | Self::UpstreamTimeout => "upstream",
            Self::ToolLoopExhausted | Self::Cancelled => "operational",
            Self::Internal => "internal",
        }
    }

    /// Classifies an HTTP status returned by a remote service.
    ///
    /// Only 429, 5xx and timeouts are considered transient; other statuses
    /// are reported as upstream errors that retrying will not fix.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            408 | 504 => Self::UpstreamTimeout,
            429 => Self::RateLimited,
            500..=599 => Self::UpstreamError,
            400 | 422 => Self::InvalidRequest,
            404 => Self::NotFound,
            _ => Self::Internal,
        }
    }

    /// Classifies a library error for the HTTP layer.
    pub fn from_error(err: &Error) -> Self {
        match err {
            Error::Validation { .. } => Self::InvalidRequest,
            Error::IterationLimit { .. } => Self::ToolLoopExhausted,
            Error::Cancelled => Self::Cancelled,
            Error::Remote { .. } => Self::UpstreamError,
            Error::Transport(t) if t.is_timeout() => Self::UpstreamTimeout,
            Error::Transport(_) => Self::UpstreamError,
            Error::Configuration { .. }
            | Error::Runtime { .. }
            | Error::Protocol { .. }
            | Error::Serialization(_) => Self::Internal,
        }
    }
}

impl fmt::Display for StandardErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_statuses_are_retryable() {
        assert!(StandardErrorCode::from_http_status(429).retryable());
        assert!(StandardErrorCode::from_http_status(500).retryable());
        assert!(StandardErrorCode::from_http_status(503).retryable());
        assert!(StandardErrorCode::from_http_status(504).retryable());
        assert!(!StandardErrorCode::from_http_status(400).retryable());
        assert!(!StandardErrorCode::from_http_status(401).retryable());
    }

    #[test]
    fn validation_maps_to_invalid_request() {
        let code = StandardErrorCode::from_error(&Error::validation("empty"));
        assert_eq!(code.name(), "invalid_request");
        assert_eq!(code.http_status(), 400);
        assert_eq!(code.to_string(), "E1001");
    }

    #[test]
    fn iteration_limit_is_operational() {
        let code = StandardErrorCode::from_error(&Error::IterationLimit { limit: 10 });
        assert_eq!(code, StandardErrorCode::ToolLoopExhausted);
        assert_eq!(code.category(), "operational");
    }
}
