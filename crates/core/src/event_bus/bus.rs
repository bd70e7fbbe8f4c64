use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use clinix_common::resilience::policies::AlwaysRetry;
use clinix_common::{RetryConfig, RetryExecutor};
use clinix_domain::DomainEvent;
use futures::FutureExt;
use parking_lot::RwLock;
use tracing::{debug, error, info, instrument};

use super::handler::{EventHandler, HandlerError};
use crate::dead_letter::{DeadLetterEntry, DeadLetterQueue};

/// A handler subscribed to one event name on behalf of a module
#[derive(Clone)]
pub struct HandlerRegistration {
    pub event_name: String,
    pub module_name: String,
    handler: Arc<dyn EventHandler>,
}

impl fmt::Debug for HandlerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistration")
            .field("event_name", &self.event_name)
            .field("module_name", &self.module_name)
            .finish_non_exhaustive()
    }
}

/// In-process event bus
///
/// Construct one per application and share it behind an `Arc`.
pub struct EventBus {
    registry: RwLock<HashMap<String, Vec<HandlerRegistration>>>,
    dead_letters: Arc<DeadLetterQueue>,
    retry: RetryExecutor<AlwaysRetry>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("retry", self.retry.config())
            .field("events", &self.registry.read().len())
            .field("dead_letters", &self.dead_letters.len())
            .finish()
    }
}

impl EventBus {
    /// Create a bus with its own dead-letter queue.
    pub fn new(retry_config: RetryConfig) -> Self {
        Self::with_dead_letter_queue(retry_config, Arc::new(DeadLetterQueue::new()))
    }

    /// Create a bus that records failures into an existing queue.
    pub fn with_dead_letter_queue(
        retry_config: RetryConfig,
        dead_letters: Arc<DeadLetterQueue>,
    ) -> Self {
        Self {
            registry: RwLock::new(HashMap::new()),
            dead_letters,
            retry: RetryExecutor::new(retry_config, AlwaysRetry),
        }
    }

    pub fn retry_config(&self) -> &RetryConfig {
        self.retry.config()
    }

    /// Register `handler` for `event_name`.
    ///
    /// Registrations are not deduplicated: subscribing the same handler twice
    /// delivers every event to it twice.
    pub fn subscribe<H>(
        &self,
        event_name: impl Into<String>,
        handler: H,
        module_name: impl Into<String>,
    ) where
        H: EventHandler + 'static,
    {
        self.subscribe_shared(event_name, Arc::new(handler), module_name);
    }

    /// Register a handler that is already shared.
    pub fn subscribe_shared(
        &self,
        event_name: impl Into<String>,
        handler: Arc<dyn EventHandler>,
        module_name: impl Into<String>,
    ) {
        let registration = HandlerRegistration {
            event_name: event_name.into(),
            module_name: module_name.into(),
            handler,
        };
        debug!(
            event_name = %registration.event_name,
            module = %registration.module_name,
            "Handler subscribed"
        );
        self.registry
            .write()
            .entry(registration.event_name.clone())
            .or_default()
            .push(registration);
    }

    /// Remove the handlers for `event_name`, or only those of `module_name`.
    ///
    /// Returns how many registrations were removed.
    pub fn unsubscribe(&self, event_name: &str, module_name: Option<&str>) -> usize {
        let mut registry = self.registry.write();

        let removed = match module_name {
            None => registry.remove(event_name).map_or(0, |registrations| registrations.len()),
            Some(module) => {
                let Some(registrations) = registry.get_mut(event_name) else {
                    return 0;
                };
                let before = registrations.len();
                registrations.retain(|registration| registration.module_name != module);
                let removed = before - registrations.len();
                if registrations.is_empty() {
                    registry.remove(event_name);
                }
                removed
            }
        };

        debug!(event_name, module = ?module_name, removed, "Handlers unsubscribed");
        removed
    }

    /// Deliver `event` to every handler subscribed to its name.
    ///
    /// Always completes; handler failures end up in the dead-letter queue.
    #[instrument(
        skip(self, event),
        fields(event_name = %event.event_name(), aggregate_id = %event.aggregate_id())
    )]
    pub async fn publish(&self, event: DomainEvent) {
        let registrations = self.registry.read().get(event.event_name()).cloned().unwrap_or_default();

        if registrations.is_empty() {
            debug!("No handlers subscribed, dropping event");
            return;
        }

        for registration in &registrations {
            self.deliver(registration, &event).await;
        }
    }

    async fn deliver(&self, registration: &HandlerRegistration, event: &DomainEvent) {
        let outcome = self
            .retry
            .execute_with_outcome(|| invoke(registration.handler.as_ref(), event))
            .await;

        match outcome.result {
            Ok(()) if outcome.attempts > 1 => {
                info!(
                    module = %registration.module_name,
                    attempts = outcome.attempts,
                    "Handler succeeded after retries"
                );
            }
            Ok(()) => {
                debug!(module = %registration.module_name, "Handler succeeded");
            }
            Err(err) => {
                let attempts = err.attempts();
                let message = err.into_last_error().to_string();
                error!(
                    module = %registration.module_name,
                    attempts,
                    error = %message,
                    "Handler failed permanently"
                );
                self.dead_letters.record(DeadLetterEntry::new(
                    event.clone(),
                    registration.module_name.clone(),
                    message,
                    attempts,
                ));
            }
        }
    }

    /// Snapshot of the dead-letter queue.
    pub fn dead_letter_queue(&self) -> Vec<DeadLetterEntry> {
        self.dead_letters.entries()
    }

    /// Shared handle to the dead-letter queue.
    pub fn dead_letters(&self) -> Arc<DeadLetterQueue> {
        Arc::clone(&self.dead_letters)
    }

    pub fn clear_dead_letter_queue(&self) {
        self.dead_letters.clear();
    }

    /// Drop every registration and dead letter.
    pub fn clear_all(&self) {
        self.registry.write().clear();
        self.dead_letters.clear();
    }

    pub fn handler_count(&self, event_name: &str) -> usize {
        self.registry.read().get(event_name).map_or(0, Vec::len)
    }

    /// Event names with at least one handler, sorted.
    pub fn subscribed_events(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.read().keys().cloned().collect();
        names.sort();
        names
    }
}

/// One handler attempt. A panic is turned into an ordinary failure so it is
/// retried and dead-lettered instead of unwinding out of `publish`.
async fn invoke(handler: &dyn EventHandler, event: &DomainEvent) -> Result<(), HandlerError> {
    match AssertUnwindSafe(handler.handle(event)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!(panic = %message, "Handler panicked");
            Err(format!("handler panicked: {message}").into())
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
