//! # Clinix Domain
//!
//! Domain types shared by the Clinix event bus and its integrations.
//!
//! This crate contains:
//! - [`DomainEvent`] and the typed payloads modules publish
//! - Domain error types and Result definitions
//! - Configuration structures
//!
//! ## Architecture
//! - Depends only on `clinix-common` for resilience configuration types
//! - Pure data structures, no I/O

pub mod config;
pub mod errors;
pub mod events;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use events::*;
