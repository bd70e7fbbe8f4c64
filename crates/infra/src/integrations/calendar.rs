//! Calendar sync
//!
//! Mirrors the internal agenda into an external calendar. The agenda is the
//! source of truth: a calendar outage is logged and reported as
//! [`CalendarSyncOutcome::Skipped`], never as an error.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinix_common::{Clock, SystemClock};
use clinix_core::{CalendarSyncOutcome, CalendarSyncPort, EventBus, EventHandler, HandlerError};
use clinix_domain::{names, AppointmentCancelled, AppointmentScheduled, DomainEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::tenant_headers;
use crate::http::{HttpClientError, ResilientHttpClient};

/// Module name the calendar handler subscribes under
pub const CALENDAR_MODULE: &str = "calendar";

#[derive(Debug, Serialize)]
struct CreateCalendarEvent<'a> {
    reference: String,
    title: &'a str,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct CancelCalendarEvent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CalendarEventCreated {
    id: String,
}

/// [`CalendarSyncPort`] backed by the calendar provider's REST API
pub struct CalendarSyncAdapter<C: Clock = SystemClock> {
    client: Arc<ResilientHttpClient<C>>,
}

impl<C: Clock> CalendarSyncAdapter<C> {
    pub fn new(client: Arc<ResilientHttpClient<C>>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ResilientHttpClient<C> {
        &self.client
    }

    async fn create_event(
        &self,
        tenant_id: &str,
        appointment: &AppointmentScheduled,
    ) -> Result<String, HttpClientError> {
        let body = CreateCalendarEvent {
            reference: appointment.appointment_id.to_string(),
            title: &appointment.title,
            starts_at: appointment.starts_at,
            ends_at: appointment.ends_at,
            location: appointment.location.as_deref(),
        };
        let response = self
            .client
            .post::<_, CalendarEventCreated>("/events", &body, Some(tenant_headers(tenant_id)?))
            .await?;
        Ok(response.data.id)
    }

    async fn cancel_event(
        &self,
        tenant_id: &str,
        external_id: &str,
        reason: Option<&str>,
    ) -> Result<(), HttpClientError> {
        let path = format!("/events/{external_id}/cancel");
        self.client
            .post::<_, Value>(&path, &CancelCalendarEvent { reason }, Some(tenant_headers(tenant_id)?))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl<C: Clock> CalendarSyncPort for CalendarSyncAdapter<C> {
    async fn push_appointment(
        &self,
        tenant_id: &str,
        appointment: &AppointmentScheduled,
    ) -> CalendarSyncOutcome {
        match self.create_event(tenant_id, appointment).await {
            Ok(external_id) => {
                info!(
                    tenant_id,
                    appointment_id = %appointment.appointment_id,
                    external_id = %external_id,
                    "Appointment pushed to calendar"
                );
                CalendarSyncOutcome::Synced { external_id }
            }
            Err(err) => {
                warn!(
                    tenant_id,
                    appointment_id = %appointment.appointment_id,
                    error = %err,
                    circuit_open = err.is_circuit_open(),
                    "Calendar sync failed, agenda unaffected"
                );
                CalendarSyncOutcome::Skipped { reason: err.message() }
            }
        }
    }

    async fn remove_appointment(
        &self,
        tenant_id: &str,
        cancellation: &AppointmentCancelled,
    ) -> CalendarSyncOutcome {
        let Some(external_id) = cancellation.external_calendar_id.as_deref() else {
            return CalendarSyncOutcome::Skipped {
                reason: "appointment was never synced to the calendar".to_string(),
            };
        };

        match self.cancel_event(tenant_id, external_id, cancellation.reason.as_deref()).await {
            Ok(()) => {
                info!(tenant_id, external_id, "Calendar event cancelled");
                CalendarSyncOutcome::Synced { external_id: external_id.to_string() }
            }
            Err(err) => {
                warn!(
                    tenant_id,
                    external_id,
                    error = %err,
                    "Calendar cancellation failed, agenda unaffected"
                );
                CalendarSyncOutcome::Skipped { reason: err.message() }
            }
        }
    }
}

/// Event bus subscriber forwarding agenda changes to a [`CalendarSyncPort`]
#[derive(Clone)]
pub struct CalendarSyncHandler {
    port: Arc<dyn CalendarSyncPort>,
}

impl CalendarSyncHandler {
    pub fn new(port: Arc<dyn CalendarSyncPort>) -> Self {
        Self { port }
    }

    /// Subscribe to scheduled and cancelled appointments as module `calendar`.
    pub fn register(self, bus: &EventBus) {
        let handler: Arc<dyn EventHandler> = Arc::new(self);
        bus.subscribe_shared(names::APPOINTMENT_SCHEDULED, Arc::clone(&handler), CALENDAR_MODULE);
        bus.subscribe_shared(names::APPOINTMENT_CANCELLED, handler, CALENDAR_MODULE);
    }
}

#[async_trait]
impl EventHandler for CalendarSyncHandler {
    async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError> {
        match event.event_name() {
            names::APPOINTMENT_SCHEDULED => {
                let appointment: AppointmentScheduled = event.typed()?;
                self.port.push_appointment(event.tenant_id(), &appointment).await;
            }
            names::APPOINTMENT_CANCELLED => {
                let cancellation: AppointmentCancelled = event.typed()?;
                self.port.remove_appointment(event.tenant_id(), &cancellation).await;
            }
            other => {
                warn!(event_name = other, "Calendar handler received unrelated event");
            }
        }
        Ok(())
    }
}
