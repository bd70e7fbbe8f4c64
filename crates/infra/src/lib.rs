//! # Clinix Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The resilient outbound HTTP client (timeouts, retry, circuit breaker)
//! - Configuration loading from environment and files
//! - Tracing subscriber initialisation
//! - External service integrations (calendar sync, patient messaging)
//!
//! ## Architecture
//! - Implements traits defined in `clinix-core`
//! - Contains all "impure" code (network, filesystem, environment)

pub mod config;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod observability;

// Re-export commonly used items
pub use http::{HttpClientBuilder, HttpClientError, HttpErrorCategory, HttpResponse, ResilientHttpClient};
pub use integrations::{CalendarSyncAdapter, CalendarSyncHandler, MessagingAdapter};
pub use observability::init_tracing;
