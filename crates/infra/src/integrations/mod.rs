//! External service integrations
//!
//! Adapters implementing the core integration ports on top of
//! [`ResilientHttpClient`](crate::http::ResilientHttpClient). Each upstream gets
//! its own client, and therefore its own circuit breaker.

pub mod calendar;
pub mod messaging;

pub use calendar::{CalendarSyncAdapter, CalendarSyncHandler, CALENDAR_MODULE};
pub use messaging::MessagingAdapter;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::http::HttpClientError;

/// Header carrying the tenant on every integration call
pub const TENANT_HEADER: &str = "x-tenant-id";

pub(crate) fn tenant_headers(tenant_id: &str) -> Result<HeaderMap, HttpClientError> {
    let value = HeaderValue::from_str(tenant_id).map_err(|err| {
        HttpClientError::InvalidRequest(format!("tenant id is not a valid header value: {err}"))
    })?;
    let mut headers = HeaderMap::new();
    headers.insert(TENANT_HEADER, value);
    Ok(headers)
}
