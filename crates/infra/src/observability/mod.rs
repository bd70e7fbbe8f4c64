//! Observability infrastructure
//!
//! Structured logging is emitted through `tracing` across all crates; this
//! module installs the process-wide subscriber.

pub mod logging;

pub use logging::init_tracing;
