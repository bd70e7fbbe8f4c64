//! Resilience patterns for fault tolerance and error handling
//!
//! This module provides **generic, reusable** resilience patterns:
//! - **Retry Logic**: bounded attempts with deterministic exponential backoff
//!   (`delay(n) = min(initial * multiplier^(n-1), max)`)
//! - **Circuit Breaker**: closed / open / half-open state machine that stops
//!   calling a known-bad upstream for a reset window
//!
//! Both the in-process event bus and the outbound HTTP client build on these
//! primitives, so backoff behaviour is identical across the two.
//!
//! ## Design
//!
//! - Generic over the operation error type; classification is delegated to a
//!   [`RetryPolicy`] supplied by the caller.
//! - Time is read through the [`Clock`] trait so breaker windows can be driven
//!   by [`MockClock`] in tests.
//! - No jitter is applied. Deterministic backoff keeps behaviour reproducible;
//!   many concurrent callers retrying against the same upstream will retry in
//!   lockstep.

pub mod circuit_breaker;
pub mod retry;

// Re-export circuit breaker types
pub use circuit_breaker::{
    CallPermit, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerConfigBuilder,
    CircuitBreakerSnapshot, CircuitOpenError, CircuitState, Clock, MockClock, ResilienceError,
    ResilienceResult, SystemClock,
};
// Re-export retry types
pub use retry::{
    policies, retry, retry_with_policy, ConfigError, RetryConfig, RetryConfigBuilder,
    RetryDecision, RetryError, RetryExecutor, RetryOutcome, RetryPolicy, RetryResult,
};
