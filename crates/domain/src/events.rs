//! Domain events exchanged between modules over the event bus
//!
//! A [`DomainEvent`] is an immutable fact: it is built once, published, and
//! never mutated afterwards. The payload is opaque JSON to the bus; modules
//! that care about its shape decode it with [`DomainEvent::payload_as`].

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::{ClinixError, Result};

/// Well-known event names
pub mod names {
    pub const APPOINTMENT_SCHEDULED: &str = "appointment.scheduled";
    pub const APPOINTMENT_CANCELLED: &str = "appointment.cancelled";
    pub const APPOINTMENT_COMPLETED: &str = "appointment.completed";
}

/// An event raised by one module and delivered to every subscriber of its name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    event_name: String,
    tenant_id: String,
    aggregate_id: String,
    payload: Value,
    occurred_at: DateTime<Utc>,
}

impl DomainEvent {
    /// Create an event that occurred now.
    pub fn new(
        event_name: impl Into<String>,
        tenant_id: impl Into<String>,
        aggregate_id: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self::at(event_name, tenant_id, aggregate_id, payload, Utc::now())
    }

    /// Create an event with an explicit occurrence time.
    pub fn at(
        event_name: impl Into<String>,
        tenant_id: impl Into<String>,
        aggregate_id: impl Into<String>,
        payload: Value,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_name: event_name.into(),
            tenant_id: tenant_id.into(),
            aggregate_id: aggregate_id.into(),
            payload,
            occurred_at,
        }
    }

    /// Build an event from a typed payload, taking the name from the type.
    pub fn from_typed<T: TypedEvent>(
        tenant_id: impl Into<String>,
        aggregate_id: impl Into<String>,
        payload: &T,
    ) -> Result<Self> {
        let payload = serde_json::to_value(payload)?;
        Ok(Self::new(T::EVENT_NAME, tenant_id, aggregate_id, payload))
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// Decode the payload into a concrete type.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.payload.clone()).map_err(|err| {
            ClinixError::InvalidInput(format!(
                "payload of '{}' does not match expected shape: {err}",
                self.event_name
            ))
        })
    }

    /// Decode the payload as the typed event it claims to be.
    ///
    /// Fails if the event name does not match `T::EVENT_NAME`.
    pub fn typed<T: TypedEvent>(&self) -> Result<T> {
        if self.event_name != T::EVENT_NAME {
            return Err(ClinixError::InvalidInput(format!(
                "expected '{}' event, got '{}'",
                T::EVENT_NAME,
                self.event_name
            )));
        }
        self.payload_as()
    }
}

/// A payload type bound to a single event name.
pub trait TypedEvent: Serialize + DeserializeOwned {
    const EVENT_NAME: &'static str;
}

/// An appointment was put on the agenda.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentScheduled {
    pub appointment_id: Uuid,
    pub patient_id: String,
    pub practitioner_id: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl TypedEvent for AppointmentScheduled {
    const EVENT_NAME: &'static str = names::APPOINTMENT_SCHEDULED;
}

/// An appointment was cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentCancelled {
    pub appointment_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Identifier assigned by the external calendar when the appointment was
    /// pushed, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_calendar_id: Option<String>,
}

impl TypedEvent for AppointmentCancelled {
    const EVENT_NAME: &'static str = names::APPOINTMENT_CANCELLED;
}

/// A consultation took place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentCompleted {
    pub appointment_id: Uuid,
    pub patient_id: String,
    pub practitioner_id: String,
    pub completed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TypedEvent for AppointmentCompleted {
    const EVENT_NAME: &'static str = names::APPOINTMENT_COMPLETED;
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn completed() -> AppointmentCompleted {
        AppointmentCompleted {
            appointment_id: Uuid::nil(),
            patient_id: "pat-1".into(),
            practitioner_id: "prac-1".into(),
            completed_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap(),
            notes: None,
        }
    }

    #[test]
    fn from_typed_uses_type_event_name() {
        let event = DomainEvent::from_typed("tenant-a", "appt-1", &completed()).unwrap();

        assert_eq!(event.event_name(), "appointment.completed");
        assert_eq!(event.tenant_id(), "tenant-a");
        assert_eq!(event.aggregate_id(), "appt-1");
        assert_eq!(event.payload()["patient_id"], "pat-1");
        assert!(event.payload().get("notes").is_none());
    }

    #[test]
    fn typed_round_trips_payload() {
        let event = DomainEvent::from_typed("t", "a", &completed()).unwrap();
        let decoded: AppointmentCompleted = event.typed().unwrap();
        assert_eq!(decoded, completed());
    }

    #[test]
    fn typed_rejects_mismatched_name() {
        let event = DomainEvent::from_typed("t", "a", &completed()).unwrap();
        let err = event.typed::<AppointmentScheduled>().unwrap_err();
        assert!(matches!(err, ClinixError::InvalidInput(_)));
    }

    #[test]
    fn payload_as_reports_shape_mismatch() {
        let event = DomainEvent::new("custom.event", "t", "a", json!({ "unexpected": true }));
        let err = event.payload_as::<AppointmentCancelled>().unwrap_err();
        assert!(err.to_string().contains("custom.event"));
    }

    #[test]
    fn identity_is_structural() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let a = DomainEvent::at("x", "t", "a", json!({ "k": 1 }), at);
        let b = DomainEvent::at("x", "t", "a", json!({ "k": 1 }), at);
        assert_eq!(a, b);
        assert_ne!(a, DomainEvent::at("x", "t", "b", json!({ "k": 1 }), at));
    }
}
