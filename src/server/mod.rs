//! HTTP 服务模块：OpenAI 兼容的对话接口、健康检查和指标。
//!
//! # Server Module
//!
//! | Route | Handler |
//! |-------|---------|
//! | `POST /v1/chat/completions` | [`chat::chat_completions`] (JSON or SSE) |
//! | `GET /health` | [`system::health`] |
//! | `GET /metrics` | [`system::metrics`], when `performance.enable_metrics` |
//! | `GET /` | [`system::index`] |
//!
//! Layers, outermost first: panic recovery, access tracing, CORS, rate limit,
//! metrics.

pub mod chat;
pub mod error;
pub mod middleware;
pub mod sse;
pub mod system;

pub use error::ApiError;

use crate::clients::{ImageTextExtractor, OcrClient};
use crate::config::GatewayConfig;
use crate::llm::{LlmBackend, LlmClient};
use crate::orchestrator::{Orchestrator, OrchestratorSettings};
use crate::resilience::{RateLimiter, RateLimiterConfig};
use crate::resolve::ContentResolver;
use crate::telemetry::Metrics;
use crate::tools::{system_prompt, ToolDispatcher, ToolExecutor};
use crate::Result;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";
pub const HEALTH_PATH: &str = "/health";
pub const METRICS_PATH: &str = "/metrics";

/// Shared by every request.
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub orchestrator: Arc<Orchestrator>,
    pub resolver: ContentResolver,
    pub system_prompt: String,
    pub metrics: Arc<Metrics>,
    pub limiter: RateLimiter,
}

impl AppState {
    /// Wires the HTTP collaborators described by `config`.
    pub fn from_config(config: GatewayConfig) -> Result<Self> {
        let llm = Arc::new(LlmClient::new(&config.llm)?);
        let tools = Arc::new(ToolDispatcher::new(&config)?);
        let ocr = Arc::new(OcrClient::new(&config.ocr)?);
        Ok(Self::with_backends(config, llm, tools, ocr))
    }

    pub fn with_backends(
        config: GatewayConfig,
        llm: Arc<dyn LlmBackend>,
        tools: Arc<dyn ToolExecutor>,
        ocr: Arc<dyn ImageTextExtractor>,
    ) -> Self {
        let settings = OrchestratorSettings::from_config(&config);
        let limiter = RateLimiter::new(
            RateLimiterConfig::new()
                .with_capacity(config.rate_limit.capacity)
                .with_refill_rate(config.rate_limit.refill_per_second),
        );
        Self {
            system_prompt: system_prompt(&config.city),
            orchestrator: Arc::new(Orchestrator::new(llm, tools, settings)),
            resolver: ContentResolver::new(ocr),
            metrics: Arc::new(Metrics::new()),
            limiter,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let metrics_enabled = state.config.performance.enable_metrics;

    let mut app = Router::new()
        .route("/", get(system::index))
        .route(HEALTH_PATH, get(system::health))
        .route(CHAT_COMPLETIONS_PATH, post(chat::chat_completions));
    if metrics_enabled {
        app = app
            .route(METRICS_PATH, get(system::metrics))
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::track_metrics,
            ));
    }

    app.layer(axum::middleware::from_fn_with_state(
        state.clone(),
        middleware::rate_limit,
    ))
    .layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_headers(Any)
            .allow_methods(Any),
    )
    .layer(TraceLayer::new_for_http())
    .layer(CatchPanicLayer::custom(error::panic_response))
    .with_state(state)
}
