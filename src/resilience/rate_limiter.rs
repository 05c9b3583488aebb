use serde::Serialize;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Monotonic time source in nanoseconds, injectable for tests.
pub trait Clock: Send + Sync {
    fn now_nanos(&self) -> i64;
}

/// Nanoseconds elapsed since the clock was created.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_nanos(&self) -> i64 {
        self.origin.elapsed().as_nanos().min(i64::MAX as u128) as i64
    }
}

/// Hand-driven clock.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now
            .fetch_add(by.as_nanos().min(i64::MAX as u128) as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_nanos(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RateLimiterSnapshot {
    pub capacity: u32,
    pub refill_per_second: u32,
    /// Whole tokens that could be taken right now.
    pub available: u32,
    /// Estimated wait time until a token is available (ms), if currently empty.
    pub estimated_wait_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum burst size.
    pub capacity: u32,
    /// Sustained tokens per second. Zero disables limiting.
    pub refill_per_second: u32,
}

impl RateLimiterConfig {
    pub fn new() -> Self {
        Self {
            capacity: 200,
            refill_per_second: 50,
        }
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_refill_rate(mut self, per_second: u32) -> Self {
        self.refill_per_second = per_second;
        self
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock-free token bucket for admission control.
///
/// The whole bucket state is a single "theoretical arrival time" (`tat`) held
/// in an `AtomicI64` and advanced by compare-and-swap, the GCRA formulation of
/// a token bucket:
///
/// - each admitted request pushes `tat` forward by one emission interval
///   (`1s / refill_per_second`);
/// - a request is admitted while `tat - now` stays within `capacity`
///   intervals, which is the burst allowance.
///
/// A clock that goes backwards never adds tokens.
pub struct RateLimiter {
    cfg: RateLimiterConfig,
    interval_nanos: i64,
    tolerance_nanos: i64,
    tat: AtomicI64,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(cfg: RateLimiterConfig) -> Self {
        Self::with_clock(cfg, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(cfg: RateLimiterConfig, clock: Arc<dyn Clock>) -> Self {
        let interval_nanos = if cfg.refill_per_second == 0 {
            0
        } else {
            NANOS_PER_SEC / i64::from(cfg.refill_per_second)
        };
        let tolerance_nanos = interval_nanos.saturating_mul(i64::from(cfg.capacity));
        let tat = AtomicI64::new(clock.now_nanos().saturating_sub(tolerance_nanos));
        Self {
            cfg,
            interval_nanos,
            tolerance_nanos,
            tat,
            clock,
        }
    }

    fn unlimited(&self) -> bool {
        self.interval_nanos == 0
    }

    /// Takes one token if available. Never blocks.
    pub fn try_acquire(&self) -> bool {
        if self.unlimited() {
            return true;
        }
        if self.cfg.capacity == 0 {
            return false;
        }

        let now = self.clock.now_nanos();
        let mut current = self.tat.load(Ordering::Acquire);
        loop {
            let new_tat = current.max(now).saturating_add(self.interval_nanos);
            if new_tat - now > self.tolerance_nanos {
                return false;
            }
            match self.tat.compare_exchange_weak(
                current,
                new_tat,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    pub fn snapshot(&self) -> RateLimiterSnapshot {
        if self.unlimited() {
            return RateLimiterSnapshot {
                capacity: self.cfg.capacity,
                refill_per_second: 0,
                available: self.cfg.capacity,
                estimated_wait_ms: None,
            };
        }

        let now = self.clock.now_nanos();
        let tat = self.tat.load(Ordering::Acquire).max(now);
        let backlog = tat - now;
        let headroom = (self.tolerance_nanos - backlog).max(0);
        let available = (headroom / self.interval_nanos) as u32;
        let estimated_wait_ms = (available == 0).then(|| {
            let wait = (backlog + self.interval_nanos - self.tolerance_nanos).max(0);
            (wait / 1_000_000) as u64
        });

        RateLimiterSnapshot {
            capacity: self.cfg.capacity,
            refill_per_second: self.cfg.refill_per_second,
            available,
            estimated_wait_ms,
        }
    }
}
