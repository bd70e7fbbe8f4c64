//! In-memory store of events whose handling permanently failed
//!
//! Entries are appended once a handler has exhausted its retry budget and are
//! never modified afterwards. Nothing is persisted: the queue lives for as long
//! as the process does, and draining or alerting on it is left to an operator
//! job.

use chrono::{DateTime, Utc};
use clinix_domain::DomainEvent;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::warn;

/// A delivery that failed after every retry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeadLetterEntry {
    pub event: DomainEvent,
    pub module_name: String,
    /// Error from the last attempt
    pub error: String,
    pub attempts: u32,
    pub recorded_at: DateTime<Utc>,
}

impl DeadLetterEntry {
    pub fn new(
        event: DomainEvent,
        module_name: impl Into<String>,
        error: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self {
            event,
            module_name: module_name.into(),
            error: error.into(),
            attempts,
            recorded_at: Utc::now(),
        }
    }
}

/// Append-only dead-letter queue, shared between the bus and its observers
#[derive(Debug, Default)]
pub struct DeadLetterQueue {
    entries: Mutex<Vec<DeadLetterEntry>>,
}

impl DeadLetterQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: DeadLetterEntry) {
        warn!(
            event_name = entry.event.event_name(),
            module = %entry.module_name,
            attempts = entry.attempts,
            error = %entry.error,
            "Event moved to dead-letter queue"
        );
        self.entries.lock().push(entry);
    }

    /// Snapshot of all entries in the order they were recorded.
    pub fn entries(&self) -> Vec<DeadLetterEntry> {
        self.entries.lock().clone()
    }

    pub fn entries_for_module(&self, module_name: &str) -> Vec<DeadLetterEntry> {
        self.entries.lock().iter().filter(|entry| entry.module_name == module_name).cloned().collect()
    }

    /// Remove and return every entry.
    pub fn drain(&self) -> Vec<DeadLetterEntry> {
        std::mem::take(&mut *self.entries.lock())
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
