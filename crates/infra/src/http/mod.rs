//! Resilient outbound HTTP
//!
//! One [`ResilientHttpClient`] per upstream. Each call is gated by the
//! client's circuit breaker, bounded by a per-attempt timeout and retried with
//! the shared backoff schedule when the failure is transient.

mod client;
mod errors;

pub use client::{HttpClientBuilder, HttpResponse, ResilientHttpClient, RetryableHttpErrors};
pub use errors::{HttpClientError, HttpErrorCategory};
