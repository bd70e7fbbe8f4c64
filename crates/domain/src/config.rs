//! Configuration management

use std::time::Duration;

use clinix_common::{CircuitBreakerConfig, RetryConfig};
use serde::{Deserialize, Serialize};

use crate::errors::{ClinixError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub event_bus: EventBusConfig,
    pub integrations: IntegrationsConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.event_bus.retry_config()?;
        self.integrations.calendar.validate()?;
        self.integrations.messaging.validate()?;
        Ok(())
    }
}

/// Retry budget applied to each event handler invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBusConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self { max_retries: 3, initial_delay_ms: 100, max_delay_ms: 5_000, backoff_multiplier: 2.0 }
    }
}

impl EventBusConfig {
    /// Validated retry configuration for the bus.
    pub fn retry_config(&self) -> Result<RetryConfig> {
        build_retry_config(
            self.max_retries,
            self.initial_delay_ms,
            self.max_delay_ms,
            self.backoff_multiplier,
        )
    }
}

/// Outbound HTTP client configuration, one per upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub circuit_breaker: CircuitBreakerSettings,
    pub user_agent: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_ms: 10_000,
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            circuit_breaker: CircuitBreakerSettings::default(),
            user_agent: None,
        }
    }
}

impl HttpClientConfig {
    /// Defaults pointed at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_config(&self) -> Result<RetryConfig> {
        build_retry_config(
            self.max_retries,
            self.initial_delay_ms,
            self.max_delay_ms,
            self.backoff_multiplier,
        )
    }

    pub fn circuit_breaker_config(&self) -> Result<CircuitBreakerConfig> {
        Ok(CircuitBreakerConfig::builder()
            .open_threshold(self.circuit_breaker.open_threshold)
            .reset_window(Duration::from_millis(self.circuit_breaker.reset_window_ms))
            .build()?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(ClinixError::Config("base_url must not be empty".into()));
        }
        if self.timeout_ms == 0 {
            return Err(ClinixError::Config("timeout_ms must be greater than 0".into()));
        }
        self.retry_config()?;
        self.circuit_breaker_config()?;
        Ok(())
    }
}

/// Circuit breaker thresholds for an HTTP client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub open_threshold: u32,
    pub reset_window_ms: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self { open_threshold: 5, reset_window_ms: 30_000 }
    }
}

/// External integrations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationsConfig {
    pub calendar: HttpClientConfig,
    pub messaging: HttpClientConfig,
}

/// Tracing output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

fn build_retry_config(
    max_retries: u32,
    initial_delay_ms: u64,
    max_delay_ms: u64,
    backoff_multiplier: f64,
) -> Result<RetryConfig> {
    Ok(RetryConfig::builder()
        .max_retries(max_retries)
        .initial_delay(Duration::from_millis(initial_delay_ms))
        .max_delay(Duration::from_millis(max_delay_ms))
        .backoff_multiplier(backoff_multiplier)
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let bus = EventBusConfig::default().retry_config().unwrap();
        assert_eq!(bus.max_retries, 3);
        assert_eq!(bus.initial_delay, Duration::from_millis(100));
        assert_eq!(bus.max_delay, Duration::from_millis(5_000));

        let http = HttpClientConfig::new("https://calendar.example.com");
        assert_eq!(http.timeout(), Duration::from_secs(10));
        let breaker = http.circuit_breaker_config().unwrap();
        assert_eq!(breaker.open_threshold, 5);
        assert_eq!(breaker.reset_window, Duration::from_secs(30));
        assert!(http.validate().is_ok());
    }

    #[test]
    fn invalid_values_surface_as_config_errors() {
        let bus = EventBusConfig { max_retries: 0, ..EventBusConfig::default() };
        assert!(matches!(bus.retry_config(), Err(ClinixError::Config(_))));

        let http = HttpClientConfig { backoff_multiplier: 0.5, ..HttpClientConfig::new("http://x") };
        assert!(matches!(http.validate(), Err(ClinixError::Config(_))));

        assert!(HttpClientConfig::default().validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: Config = serde_json::from_str(
            r#"{ "integrations": { "calendar": { "base_url": "http://cal", "max_retries": 5 } } }"#,
        )
        .unwrap();

        assert_eq!(config.integrations.calendar.max_retries, 5);
        assert_eq!(config.integrations.calendar.timeout_ms, 10_000);
        assert_eq!(config.event_bus, EventBusConfig::default());
        assert_eq!(config.logging.level, "info");
    }
}
