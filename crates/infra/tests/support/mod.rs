#![allow(dead_code)]

use std::time::Duration;

use chrono::{TimeZone, Utc};
use clinix_domain::{AppointmentCancelled, AppointmentScheduled, HttpClientConfig};
use uuid::Uuid;

/// Client configuration with millisecond backoff against a mock upstream.
pub fn fast_client_config(base_url: String, max_retries: u32) -> HttpClientConfig {
    HttpClientConfig {
        timeout_ms: 1_000,
        max_retries,
        initial_delay_ms: 1,
        max_delay_ms: 5,
        ..HttpClientConfig::new(base_url)
    }
}

pub fn short_timeout(config: HttpClientConfig, timeout: Duration) -> HttpClientConfig {
    HttpClientConfig { timeout_ms: timeout.as_millis() as u64, ..config }
}

pub fn scheduled_appointment() -> AppointmentScheduled {
    AppointmentScheduled {
        appointment_id: Uuid::new_v4(),
        patient_id: "patient-7".to_string(),
        practitioner_id: "dr-lee".to_string(),
        starts_at: Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
        ends_at: Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap(),
        title: "Follow-up consultation".to_string(),
        location: Some("Room 3".to_string()),
    }
}

pub fn cancellation(external_calendar_id: Option<&str>) -> AppointmentCancelled {
    AppointmentCancelled {
        appointment_id: Uuid::new_v4(),
        reason: Some("patient request".to_string()),
        external_calendar_id: external_calendar_id.map(str::to_string),
    }
}
