//! Health, metrics and service-info routes.

use super::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: i64,
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        timestamp: chrono::Utc::now().timestamp(),
    })
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Json<crate::telemetry::MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

pub async fn index(State(state): State<Arc<AppState>>) -> Json<Value> {
    let mut endpoints = vec!["POST /v1/chat/completions", "GET /health"];
    if state.config.performance.enable_metrics {
        endpoints.push("GET /metrics (性能指标)");
    }
    Json(json!({
        "message": format!("{} API", state.config.city.system_name),
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.config.orchestration.exposed_model,
        "endpoints": endpoints,
    }))
}
