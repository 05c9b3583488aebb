//! 遥测模块：请求计数、并发数和按端点统计的延迟。
//!
//! # Telemetry Module
//!
//! Process-wide request metrics served at `GET /metrics`.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Metrics`] | Lock-free request counters plus per-endpoint latency |
//! | [`RequestGuard`] | Keeps `active` accurate even when a handler panics |
//! | [`MetricsSnapshot`] | Serializable point-in-time view |
//!
//! ```rust
//! use job_chat_gateway::telemetry::Metrics;
//! use std::time::Duration;
//!
//! let metrics = Metrics::new();
//! let guard = metrics.begin_request();
//! guard.finish("/v1/chat/completions", Duration::from_millis(30), false);
//! assert_eq!(metrics.snapshot().requests.total, 1);
//! ```

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RequestCounts {
    pub total: u64,
    pub active: u64,
    pub failed: u64,
    pub stream: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LatencyStats {
    pub count: u64,
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct LatencyAccumulator {
    count: u64,
    total: Duration,
    min: Duration,
    max: Duration,
}

impl LatencyAccumulator {
    fn record(&mut self, elapsed: Duration) {
        if self.count == 0 || elapsed < self.min {
            self.min = elapsed;
        }
        self.max = self.max.max(elapsed);
        self.total += elapsed;
        self.count += 1;
    }

    fn stats(&self) -> LatencyStats {
        let ms = |d: Duration| d.as_secs_f64() * 1000.0;
        LatencyStats {
            count: self.count,
            avg_ms: if self.count == 0 {
                0.0
            } else {
                ms(self.total) / self.count as f64
            },
            min_ms: ms(self.min),
            max_ms: ms(self.max),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests: RequestCounts,
    pub uptime_secs: u64,
    /// Average requests per second since start.
    pub qps: f64,
    pub endpoints: BTreeMap<String, LatencyStats>,
}

#[derive(Debug, Default)]
struct AtomicCounts {
    total: AtomicU64,
    active: AtomicU64,
    failed: AtomicU64,
    stream: AtomicU64,
}

#[derive(Debug)]
pub struct Metrics {
    started: Instant,
    counts: AtomicCounts,
    latency: RwLock<BTreeMap<String, LatencyAccumulator>>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            counts: AtomicCounts::default(),
            latency: RwLock::new(BTreeMap::new()),
        }
    }

    /// Counts a request as started and active.
    pub fn begin_request(&self) -> RequestGuard<'_> {
        self.counts.total.fetch_add(1, Ordering::Relaxed);
        self.counts.active.fetch_add(1, Ordering::Relaxed);
        RequestGuard {
            metrics: self,
            finished: false,
        }
    }

    pub fn record_stream(&self) {
        self.counts.stream.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.counts.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_latency(&self, endpoint: &str, elapsed: Duration) {
        let mut map = self.latency.write().unwrap_or_else(|e| e.into_inner());
        map.entry(endpoint.to_string()).or_default().record(elapsed);
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = RequestCounts {
            total: self.counts.total.load(Ordering::Relaxed),
            active: self.counts.active.load(Ordering::Relaxed),
            failed: self.counts.failed.load(Ordering::Relaxed),
            stream: self.counts.stream.load(Ordering::Relaxed),
        };
        let uptime = self.uptime();
        let secs = uptime.as_secs_f64();
        let qps = if secs > 0.0 {
            requests.total as f64 / secs
        } else {
            0.0
        };
        let endpoints = self
            .latency
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(k, v)| (k.clone(), v.stats()))
            .collect();
        MetricsSnapshot {
            requests,
            uptime_secs: uptime.as_secs(),
            qps,
            endpoints,
        }
    }
}

/// Decrements `active` on drop.
pub struct RequestGuard<'a> {
    metrics: &'a Metrics,
    finished: bool,
}

impl RequestGuard<'_> {
    pub fn finish(mut self, endpoint: &str, elapsed: Duration, failed: bool) {
        if failed {
            self.metrics.record_failure();
        }
        self.metrics.record_latency(endpoint, elapsed);
        self.finished = true;
    }
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            // unwound before finishing
            self.metrics.record_failure();
        }
        self.metrics.counts.active.fetch_sub(1, Ordering::Relaxed);
    }
}
