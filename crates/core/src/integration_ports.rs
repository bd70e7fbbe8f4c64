//! External integration port interfaces
//!
//! Implemented in `clinix-infra` on top of the resilient HTTP client.

use async_trait::async_trait;
use clinix_domain::{AppointmentCancelled, AppointmentScheduled, Result};
use serde::{Deserialize, Serialize};

/// Result of pushing an agenda change to the external calendar.
///
/// The internal agenda stays authoritative, so a failed sync is reported as
/// `Skipped` rather than as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CalendarSyncOutcome {
    Synced { external_id: String },
    Skipped { reason: String },
}

impl CalendarSyncOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, Self::Synced { .. })
    }
}

/// Trait for mirroring appointments into an external calendar
#[async_trait]
pub trait CalendarSyncPort: Send + Sync {
    /// Create the calendar entry for a newly scheduled appointment
    async fn push_appointment(
        &self,
        tenant_id: &str,
        appointment: &AppointmentScheduled,
    ) -> CalendarSyncOutcome;

    /// Cancel the calendar entry of a cancelled appointment
    async fn remove_appointment(
        &self,
        tenant_id: &str,
        cancellation: &AppointmentCancelled,
    ) -> CalendarSyncOutcome;
}

/// Delivery channel for patient messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageChannel {
    Sms,
    Email,
}

/// A message to a patient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub tenant_id: String,
    pub recipient: String,
    pub channel: MessageChannel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub body: String,
}

/// Acknowledgement from the messaging provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReceipt {
    pub message_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Trait for sending patient messages
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_message(&self, message: &OutboundMessage) -> Result<MessageReceipt>;
}
