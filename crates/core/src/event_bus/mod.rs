//! In-process publish/subscribe between modules
//!
//! Modules subscribe handlers by event name; publishers hand a
//! [`DomainEvent`](clinix_domain::DomainEvent) to [`EventBus::publish`] and
//! never observe handler failures. Each handler runs under its own retry
//! budget and lands in the dead-letter queue once that budget is spent.
//!
//! Handlers for one event run one after another in subscription order. A
//! handler that is backing off delays the handlers behind it; independent
//! `publish` calls are not serialized against each other.

mod bus;
mod handler;

pub use bus::{EventBus, HandlerRegistration};
pub use handler::{handler_fn, EventHandler, FnHandler, HandlerError};
