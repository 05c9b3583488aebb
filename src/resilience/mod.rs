//! 弹性模块：提供无锁限流器和按服务配置的重试策略。
//!
//! # Resilience Primitives Module
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`rate_limiter`] | Lock-free token bucket for request admission |
//! | [`retry`] | Per-collaborator retry schedules |
//!
//! ## Rate Limiter
//!
//! ```rust
//! use job_chat_gateway::resilience::rate_limiter::{RateLimiter, RateLimiterConfig};
//!
//! let limiter = RateLimiter::new(
//!     RateLimiterConfig::new().with_capacity(2).with_refill_rate(1),
//! );
//! assert!(limiter.try_acquire());
//! assert!(limiter.try_acquire());
//! assert!(!limiter.try_acquire());
//! ```
//!
//! ## Retry
//!
//! ```rust
//! use job_chat_gateway::resilience::retry::{Backoff, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::default().with_backoff(Backoff::Exponential);
//! assert_eq!(policy.delay_for(2), Duration::from_secs(4));
//! ```

pub mod rate_limiter;
pub mod retry;

pub use rate_limiter::{Clock, ManualClock, RateLimiter, RateLimiterConfig, SystemClock};
pub use retry::{Backoff, RetryPolicy};
