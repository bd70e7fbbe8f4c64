use std::time::Duration;

use clinix_common::resilience::{
    CircuitBreaker, CircuitBreakerSnapshot, Clock, RetryDecision, RetryExecutor, RetryPolicy,
    SystemClock,
};
use clinix_domain::HttpClientConfig;
use reqwest::header::HeaderMap;
use reqwest::{Client as ReqwestClient, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::errors::HttpClientError;
use crate::errors::IntoHttpClientError;

/// Longest upstream error body kept in a [`HttpClientError::Status`] message
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Decoded 2xx response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse<T> {
    pub status: u16,
    pub data: T,
}

/// Retries only the failures [`HttpClientError::is_retryable`] accepts.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryableHttpErrors;

impl RetryPolicy<HttpClientError> for RetryableHttpErrors {
    fn should_retry(&self, error: &HttpClientError, _attempt: u32) -> RetryDecision {
        if error.is_retryable() {
            RetryDecision::Retry
        } else {
            RetryDecision::Stop
        }
    }
}

/// HTTP client for one upstream with timeout, retry and circuit breaking.
///
/// The breaker counts logical calls: a call that fails after all of its
/// retries records a single failure.
pub struct ResilientHttpClient<C: Clock = SystemClock> {
    client: ReqwestClient,
    base_url: String,
    timeout: Duration,
    retry: RetryExecutor<RetryableHttpErrors>,
    breaker: CircuitBreaker<C>,
}

impl<C: Clock> std::fmt::Debug for ResilientHttpClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientHttpClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("retry", self.retry.config())
            .field("breaker", &self.breaker)
            .finish()
    }
}

impl ResilientHttpClient<SystemClock> {
    /// Create a client from configuration.
    pub fn new(config: HttpClientConfig) -> Result<Self, HttpClientError> {
        Self::builder().config(config).build()
    }

    /// Start building a new client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }
}

impl<C: Clock> ResilientHttpClient<C> {
    /// Create a client whose breaker reads time from `clock`.
    pub fn with_clock(config: HttpClientConfig, clock: C) -> Result<Self, HttpClientError> {
        HttpClientBuilder::default().config(config).build_with_clock(clock)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Execute a GET request
    #[instrument(skip(self, headers), fields(method = "GET"))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        headers: Option<HeaderMap>,
    ) -> Result<HttpResponse<T>, HttpClientError> {
        self.call(Method::GET, path, None, headers).await
    }

    /// Execute a POST request with a JSON body
    #[instrument(skip(self, body, headers), fields(method = "POST"))]
    pub async fn post<B, T>(
        &self,
        path: &str,
        body: &B,
        headers: Option<HeaderMap>,
    ) -> Result<HttpResponse<T>, HttpClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body).map_err(|err| {
            HttpClientError::InvalidRequest(format!("Failed to serialize body: {err}"))
        })?;
        self.call(Method::POST, path, Some(body), headers).await
    }

    /// Current breaker counters
    pub fn circuit_breaker_state(&self) -> CircuitBreakerSnapshot {
        self.breaker.snapshot()
    }

    pub fn reset_circuit_breaker(&self) {
        self.breaker.reset();
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: Option<HeaderMap>,
    ) -> Result<HttpResponse<T>, HttpClientError> {
        let url = self.url_for(path);

        let permit = self.breaker.try_acquire().map_err(|err| {
            warn!(url = %url, retry_after = ?err.retry_after, "Circuit open, request not sent");
            HttpClientError::CircuitOpen
        })?;

        let outcome = self
            .retry
            .execute_with_outcome(|| {
                self.attempt(method.clone(), &url, body.as_ref(), headers.as_ref())
            })
            .await;
        let attempts = outcome.attempts;

        match outcome.result {
            Ok((status, bytes)) => {
                permit.success();
                debug!(url = %url, status = status.as_u16(), attempts, "HTTP request succeeded");
                let data = decode_body(status, &bytes)?;
                Ok(HttpResponse { status: status.as_u16(), data })
            }
            Err(err) => {
                permit.failure();
                let err = err.into_last_error();
                let snapshot = self.breaker.snapshot();
                warn!(
                    url = %url,
                    attempts,
                    error = %err,
                    breaker_state = %snapshot.state,
                    consecutive_failures = snapshot.failure_count,
                    "HTTP request failed"
                );
                Err(err)
            }
        }
    }

    /// One bounded attempt. Dropping the exchange future on timeout aborts the
    /// in-flight request.
    async fn attempt(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        headers: Option<&HeaderMap>,
    ) -> Result<(StatusCode, Vec<u8>), HttpClientError> {
        let mut request = self.client.request(method, url);
        if let Some(headers) = headers {
            request = request.headers(headers.clone());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let bytes = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, bytes.to_vec()))
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Err(_) => Err(HttpClientError::Timeout { timeout: self.timeout }),
            Ok(Err(err)) => Err(err.into_http_error(self.timeout)),
            Ok(Ok((status, bytes))) if status.is_success() => Ok((status, bytes)),
            Ok(Ok((status, bytes))) => Err(status_error(status, &bytes)),
        }
    }

    fn url_for(&self, path: &str) -> String {
        if path.is_empty() {
            return self.base_url.clone();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn status_error(status: StatusCode, body: &[u8]) -> HttpClientError {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    let message = if text.is_empty() {
        status.canonical_reason().unwrap_or("unknown status").to_string()
    } else {
        text.chars().take(MAX_ERROR_BODY_CHARS).collect()
    };
    HttpClientError::Status { status: status.as_u16(), message }
}

fn decode_body<T: DeserializeOwned>(status: StatusCode, bytes: &[u8]) -> Result<T, HttpClientError> {
    // 204/205 carry no body by definition; an empty 2xx body is treated alike.
    if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT || bytes.is_empty() {
        return serde_json::from_value(Value::Null).map_err(|_| {
            HttpClientError::Decode(format!(
                "empty response ({}) cannot be decoded into the requested type",
                status.as_u16()
            ))
        });
    }

    serde_json::from_slice(bytes)
        .map_err(|err| HttpClientError::Decode(format!("invalid JSON response: {err}")))
}

/// Builder for [`ResilientHttpClient`].
#[derive(Debug, Default)]
pub struct HttpClientBuilder {
    config: HttpClientConfig,
    default_headers: Option<HeaderMap>,
}

impl HttpClientBuilder {
    /// Replace the whole configuration.
    pub fn config(mut self, config: HttpClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Total number of attempts per call (initial try + retries).
    pub fn max_retries(mut self, attempts: u32) -> Self {
        self.config.max_retries = attempts;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(agent.into());
        self
    }

    /// Headers sent with every request.
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    pub fn build(self) -> Result<ResilientHttpClient<SystemClock>, HttpClientError> {
        self.build_with_clock(SystemClock)
    }

    pub fn build_with_clock<C: Clock>(
        self,
        clock: C,
    ) -> Result<ResilientHttpClient<C>, HttpClientError> {
        let config = self.config;
        config.validate().map_err(|err| HttpClientError::Config(err.to_string()))?;

        let base_url = Url::parse(config.base_url.trim())
            .map_err(|err| HttpClientError::Config(format!("invalid base_url: {err}")))?;
        let retry_config =
            config.retry_config().map_err(|err| HttpClientError::Config(err.to_string()))?;
        let breaker_config = config
            .circuit_breaker_config()
            .map_err(|err| HttpClientError::Config(err.to_string()))?;
        let breaker = CircuitBreaker::with_clock(breaker_config, clock)
            .map_err(|err| HttpClientError::Config(err.to_string()))?;

        let timeout = config.timeout();
        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("clinix/{}", env!("CARGO_PKG_VERSION")));

        let mut builder = ReqwestClient::builder().timeout(timeout).user_agent(user_agent).no_proxy();
        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }
        let client = builder
            .build()
            .map_err(|err| HttpClientError::Config(format!("Failed to build HTTP client: {err}")))?;

        info!(
            base_url = %base_url,
            timeout_ms = config.timeout_ms,
            max_retries = config.max_retries,
            "HTTP client configured"
        );

        Ok(ResilientHttpClient {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            timeout,
            retry: RetryExecutor::new(retry_config, RetryableHttpErrors),
            breaker,
        })
    }
}
