//! HTTP client error types
//!
//! Provides error classification for outbound calls with retry metadata.

use std::time::Duration;

use thiserror::Error;

/// Categories of HTTP client errors for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpErrorCategory {
    /// Attempt exceeded its timeout - retryable
    Timeout,
    /// Breaker rejected the call before any request was sent
    CircuitOpen,
    /// Rate limiting (429) - retryable
    RateLimit,
    /// Server errors (5xx) - retryable
    Server,
    /// Client errors (4xx except 429) - non-retryable
    Client,
    /// Connection/transport errors - retryable
    Network,
    /// Response body did not match the expected type
    Decode,
    /// Request or client misconfiguration - non-retryable
    Config,
}

/// Outbound HTTP failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpClientError {
    #[error("Request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Circuit breaker open, request not sent")]
    CircuitOpen,

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl HttpClientError {
    pub fn category(&self) -> HttpErrorCategory {
        match self {
            Self::Timeout { .. } => HttpErrorCategory::Timeout,
            Self::CircuitOpen => HttpErrorCategory::CircuitOpen,
            Self::Status { status: 429, .. } => HttpErrorCategory::RateLimit,
            Self::Status { status, .. } if *status >= 500 => HttpErrorCategory::Server,
            Self::Status { .. } => HttpErrorCategory::Client,
            Self::Network(_) => HttpErrorCategory::Network,
            Self::Decode(_) => HttpErrorCategory::Decode,
            Self::InvalidRequest(_) | Self::Config(_) => HttpErrorCategory::Config,
        }
    }

    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            HttpErrorCategory::Timeout
                | HttpErrorCategory::RateLimit
                | HttpErrorCategory::Server
                | HttpErrorCategory::Network
        )
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    /// HTTP status of the failed response, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> HttpClientError {
        HttpClientError::Status { status: code, message: "test".into() }
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(status(429).category(), HttpErrorCategory::RateLimit);
        assert_eq!(status(503).category(), HttpErrorCategory::Server);
        assert_eq!(status(404).category(), HttpErrorCategory::Client);
        assert_eq!(
            HttpClientError::Timeout { timeout: Duration::from_secs(1) }.category(),
            HttpErrorCategory::Timeout
        );
        assert_eq!(HttpClientError::CircuitOpen.category(), HttpErrorCategory::CircuitOpen);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(status(500).is_retryable());
        assert!(status(429).is_retryable());
        assert!(HttpClientError::Network("reset".into()).is_retryable());
        assert!(HttpClientError::Timeout { timeout: Duration::from_millis(5) }.is_retryable());

        assert!(!status(400).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(!HttpClientError::CircuitOpen.is_retryable());
        assert!(!HttpClientError::Decode("eof".into()).is_retryable());
    }

    #[test]
    fn test_flags_and_status() {
        let timeout = HttpClientError::Timeout { timeout: Duration::from_millis(50) };
        assert!(timeout.is_timeout());
        assert!(!timeout.is_circuit_open());
        assert_eq!(timeout.status(), None);

        assert!(HttpClientError::CircuitOpen.is_circuit_open());
        assert_eq!(status(502).status(), Some(502));
        assert_eq!(status(502).message(), "HTTP 502: test");
    }
}
