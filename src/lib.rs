//! # job-chat-gateway
//!
//! 面向岗位匹配场景的 OpenAI 兼容对话网关：多轮工具调用编排、推理内容过滤和岗位幻觉拦截。
//!
//! OpenAI-compatible chat gateway that sits between chat clients and an
//! OpenAI-style model backend, running the tool-calling loop on the client's
//! behalf.
//!
//! ## Overview
//!
//! A request on `POST /v1/chat/completions` goes through:
//!
//! 1. content resolution: image parts are OCR'd into text ([`resolve`]);
//! 2. the orchestration loop: model rounds and tool execution ([`orchestrator`]);
//! 3. the relay: SSE chunks or one buffered `chat.completion` ([`server`]).
//!
//! Model output is cleaned of `<think>` reasoning spans, and job listings the
//! model invents are intercepted before the client sees them ([`guardrails`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use job_chat_gateway::config::GatewayConfig;
//! use job_chat_gateway::server::{router, AppState};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cfg = GatewayConfig::load("config.yaml")?;
//!     let addr = cfg.server.bind_address();
//!     let app = router(Arc::new(AppState::from_config(cfg)?));
//!     let listener = tokio::net::TcpListener::bind(addr).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | OpenAI wire types (messages, tool calls, chunks) |
//! | [`config`] | YAML configuration with environment overrides |
//! | [`transport`] | HTTP client and SSE decoding |
//! | [`resilience`] | Token-bucket rate limiting and retry policies |
//! | [`llm`] | Model backend interface and HTTP client |
//! | [`clients`] | Map, job, OCR and policy services |
//! | [`tools`] | Tool catalog, system prompt and dispatcher |
//! | [`guardrails`] | Reasoning filter, fabrication and intent detection |
//! | [`resolve`] | Multi-part content flattening |
//! | [`orchestrator`] | The tool-calling loop, buffered and streaming |
//! | [`server`] | axum routes and middleware |
//! | [`telemetry`] | Request metrics |

pub mod clients;
pub mod config;
pub mod error_code;
pub mod guardrails;
pub mod llm;
pub mod orchestrator;
pub mod resilience;
pub mod resolve;
pub mod server;
pub mod telemetry;
pub mod tools;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use orchestrator::{Orchestrator, OrchestratorSettings, SamplingParams};
pub use types::{
    message::{Message, MessageRole},
    tool::ToolCall,
};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A specialized Result for stream items
pub type PipeResult<T> = std::result::Result<T, Error>;

/// A unified pinned, boxed stream that emits `PipeResult<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = PipeResult<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
