//! Shared test helpers for `clinix-core` integration tests.
//!
//! In-memory module handlers standing in for the clinical records and billing
//! modules that subscribe to appointment events.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use clinix_common::RetryConfig;
use clinix_core::{EventHandler, HandlerError};
use clinix_domain::{AppointmentCompleted, DomainEvent};
use parking_lot::Mutex;
use uuid::Uuid;

/// Retry config with millisecond delays so tests stay fast.
pub fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig::builder()
        .max_retries(max_retries)
        .initial_delay(Duration::from_millis(5))
        .max_delay(Duration::from_millis(20))
        .backoff_multiplier(2.0)
        .build()
        .expect("valid retry config")
}

pub fn appointment_completed(tenant: &str) -> DomainEvent {
    let payload = AppointmentCompleted {
        appointment_id: Uuid::new_v4(),
        patient_id: "patient-42".into(),
        practitioner_id: "dr-house".into(),
        completed_at: Utc.with_ymd_and_hms(2024, 5, 2, 14, 0, 0).unwrap(),
        notes: Some("follow-up in 2 weeks".into()),
    };
    DomainEvent::from_typed(tenant, payload.appointment_id.to_string(), &payload)
        .expect("payload serializes")
}

/// Creates a clinical record per completed appointment.
#[derive(Default, Clone)]
pub struct ClinicalRecords {
    records: Arc<Mutex<Vec<String>>>,
}

impl ClinicalRecords {
    pub fn records(&self) -> Vec<String> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl EventHandler for ClinicalRecords {
    async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError> {
        let completed: AppointmentCompleted = event.typed()?;
        self.records.lock().push(format!("{}:{}", completed.patient_id, event.aggregate_id()));
        Ok(())
    }
}

/// Billing module whose invoicing backend is down.
#[derive(Default, Clone)]
pub struct BrokenBilling {
    calls: Arc<AtomicU32>,
}

impl BrokenBilling {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventHandler for BrokenBilling {
    async fn handle(&self, _event: &DomainEvent) -> Result<(), HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err("invoice service unavailable".into())
    }
}

/// Fails a fixed number of times, then succeeds.
#[derive(Clone)]
pub struct Flaky {
    failures_left: Arc<AtomicU32>,
    calls: Arc<AtomicU32>,
}

impl Flaky {
    pub fn failing(times: u32) -> Self {
        Self { failures_left: Arc::new(AtomicU32::new(times)), calls: Arc::new(AtomicU32::new(0)) }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventHandler for Flaky {
    async fn handle(&self, _event: &DomainEvent) -> Result<(), HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(format!("transient failure, {remaining} left").into());
        }
        Ok(())
    }
}

/// Billing module that assumes an `invoice_total` field every payload lacks.
#[derive(Default, Clone)]
pub struct PanickingBilling {
    calls: Arc<AtomicU32>,
}

impl PanickingBilling {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventHandler for PanickingBilling {
    async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let total = event.payload().get("invoice_total").and_then(serde_json::Value::as_f64);
        let _invoice_total = total.unwrap();
        Ok(())
    }
}
