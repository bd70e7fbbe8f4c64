//! # Clinix Core
//!
//! In-process event delivery between independently owned modules.
//!
//! This crate contains:
//! - The [`EventBus`] and the [`EventHandler`] trait subscribers implement
//! - The in-memory [`DeadLetterQueue`] for permanently failed deliveries
//! - Port interfaces for external integrations (calendar, messaging)
//!
//! ## Architecture Principles
//! - Depends on `clinix-common` and `clinix-domain` only
//! - No HTTP or platform code; integrations are reached through traits

pub mod dead_letter;
pub mod event_bus;
pub mod integration_ports;

pub use dead_letter::{DeadLetterEntry, DeadLetterQueue};
pub use event_bus::{handler_fn, EventBus, EventHandler, FnHandler, HandlerError, HandlerRegistration};
pub use integration_ports::{
    CalendarSyncOutcome, CalendarSyncPort, MessageChannel, MessageReceipt, MessagingPort,
    OutboundMessage,
};
