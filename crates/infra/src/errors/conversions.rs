//! Conversions from external infrastructure errors into Clinix errors.

use std::time::Duration;

use clinix_domain::ClinixError;
use reqwest::Error as ReqwestError;

use crate::http::HttpClientError;

/// Classify a transport error raised while an attempt was bounded by
/// `timeout`.
pub trait IntoHttpClientError {
    fn into_http_error(self, timeout: Duration) -> HttpClientError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → HttpClientError */
/* -------------------------------------------------------------------------- */

impl IntoHttpClientError for ReqwestError {
    fn into_http_error(self, timeout: Duration) -> HttpClientError {
        if self.is_timeout() {
            return HttpClientError::Timeout { timeout };
        }

        if self.is_builder() {
            return HttpClientError::InvalidRequest(self.to_string());
        }

        #[cfg(not(target_arch = "wasm32"))]
        if self.is_connect() {
            return HttpClientError::Network(format!("connection failure: {self}"));
        }

        if let Some(status) = self.status() {
            return HttpClientError::Status {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unknown status").to_string(),
            };
        }

        if self.is_decode() {
            return HttpClientError::Decode(self.to_string());
        }

        HttpClientError::Network(self.to_string())
    }
}

/* -------------------------------------------------------------------------- */
/* HttpClientError → ClinixError */
/* -------------------------------------------------------------------------- */

impl From<HttpClientError> for ClinixError {
    fn from(err: HttpClientError) -> Self {
        let message = err.message();
        match err {
            HttpClientError::Timeout { .. }
            | HttpClientError::CircuitOpen
            | HttpClientError::Network(_) => ClinixError::Network(message),
            HttpClientError::Status { status: 404, .. } => ClinixError::NotFound(message),
            HttpClientError::Status { .. } | HttpClientError::Decode(_) => {
                ClinixError::Integration(message)
            }
            HttpClientError::InvalidRequest(_) => ClinixError::InvalidInput(message),
            HttpClientError::Config(_) => ClinixError::Config(message),
        }
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
