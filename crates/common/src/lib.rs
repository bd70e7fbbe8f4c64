//! Modular common utilities shared across Clinix crates.
//!
//! # Safety and Quality
//!
//! This crate enforces strict safety and quality standards to ensure
//! reliability across all Clinix components.
//!
//! # Modules
//!
//! - [`resilience`]: retry executor with deterministic backoff and the
//!   circuit breaker guarding outbound calls

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod resilience;

// Re-export commonly used types and traits for convenience
// ------------------------
pub use resilience::{
    retry, retry_with_policy, CallPermit, CircuitBreaker, CircuitBreakerConfig,
    CircuitBreakerConfigBuilder, CircuitBreakerSnapshot, CircuitOpenError, CircuitState, Clock,
    ConfigError, MockClock, ResilienceError, RetryConfig, RetryConfigBuilder, RetryDecision,
    RetryError, RetryExecutor, RetryOutcome, RetryPolicy, RetryResult, SystemClock,
};
