//! 传输层模块：封装 HTTP 客户端与 SSE 流解码。
//!
//! # Transport Module
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`HttpTransport`] | Pooled `reqwest` client bound to one base URL |
//! | [`SseDecoder`] | Incremental `data:` frame decoder for event streams |
//! | [`TransportError`] | Network-level failures |

pub mod http;
pub mod sse;

pub use http::HttpTransport;
pub use sse::SseDecoder;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        match self {
            TransportError::Http(e) => e.is_timeout(),
            TransportError::Other(_) => false,
        }
    }
}
