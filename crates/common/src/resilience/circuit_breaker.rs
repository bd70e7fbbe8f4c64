//! Circuit breaker guarding a single logical upstream
//!
//! State machine:
//! - **closed** (initial): calls pass; each failure increments the
//!   consecutive-failure count; reaching `open_threshold` opens the circuit.
//! - **open**: calls are rejected without being attempted until
//!   `reset_window` has elapsed since the last failure; the next call then
//!   moves the breaker to half-open and is let through as a probe.
//! - **half-open**: one probe at a time. Success closes the circuit and clears
//!   the failure count; failure re-opens it and restarts the window.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::retry::ConfigError;

//==============================================================================
// Time Abstraction for Testability
//==============================================================================

/// Trait for time operations to enable deterministic testing
///
/// Production code uses [`SystemClock`]; tests drive reset windows with
/// [`MockClock`] instead of sleeping.
pub trait Clock: Send + Sync + 'static {
    /// Get current instant (monotonic time)
    fn now(&self) -> Instant;

    /// Get current system time (wall clock)
    fn system_time(&self) -> SystemTime;
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn system_time(&self) -> SystemTime {
        (**self).system_time()
    }
}

/// Mock clock for deterministic testing
///
/// Clones share the same elapsed offset, so a test can keep one handle and
/// advance the clock seen by the breaker.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    start_wall: SystemTime,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Create a new mock clock starting at the current instant
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            start_wall: SystemTime::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        *self.elapsed.lock() += duration;
    }

    /// Advance the mock clock by milliseconds
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Set the mock clock to a specific elapsed time
    pub fn set_elapsed(&self, duration: Duration) {
        *self.elapsed.lock() = duration;
    }

    /// Get the current elapsed time
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        self.start_wall + self.elapsed()
    }
}

//==============================================================================
// Error Types
//==============================================================================

/// Returned when the breaker rejects a call without attempting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("circuit breaker is open, rejecting calls")]
pub struct CircuitOpenError {
    /// Time left until the breaker will admit a probe, if known
    pub retry_after: Option<Duration>,
}

/// Errors produced by [`CircuitBreaker::execute`]
#[derive(Debug, Error)]
pub enum ResilienceError<E> {
    /// Circuit breaker is open, rejecting calls
    #[error("Circuit breaker is open, rejecting calls")]
    CircuitOpen,

    /// The underlying operation failed
    #[error("Operation failed: {source}")]
    OperationFailed { source: E },
}

/// Result type for resilience operations
pub type ResilienceResult<T, E> = Result<T, ResilienceError<E>>;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    /// Circuit is closed, allowing requests
    Closed,
    /// Circuit is open, rejecting requests
    Open,
    /// Circuit is half-open, allowing a single probe
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half-open"),
        }
    }
}

//==============================================================================
// Configuration
//==============================================================================

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub open_threshold: u32,
    /// Time since the last failure before a probe is admitted
    pub reset_window: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self { open_threshold: 5, reset_window: Duration::from_secs(30) }
    }
}

impl CircuitBreakerConfig {
    /// Create a configuration builder
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.open_threshold == 0 {
            return Err(ConfigError::invalid("open_threshold must be greater than 0"));
        }
        Ok(())
    }
}

/// Builder for CircuitBreakerConfig
#[derive(Debug, Default)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl CircuitBreakerConfigBuilder {
    pub fn new() -> Self {
        Self { config: CircuitBreakerConfig::default() }
    }

    pub fn open_threshold(mut self, threshold: u32) -> Self {
        self.config.open_threshold = threshold;
        self
    }

    pub fn reset_window(mut self, window: Duration) -> Self {
        self.config.reset_window = window;
        self
    }

    pub fn build(self) -> Result<CircuitBreakerConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

//==============================================================================
// Circuit Breaker
//==============================================================================

/// Point-in-time view of the breaker for monitoring
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitBreakerSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub success_count: u64,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    success_count: u64,
    last_failure_at: Option<Instant>,
    last_failure_wall: Option<SystemTime>,
    probe_in_flight: bool,
}

impl BreakerState {
    const fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            success_count: 0,
            last_failure_at: None,
            last_failure_wall: None,
            probe_in_flight: false,
        }
    }
}

/// Circuit breaker for one logical upstream
///
/// Cloning yields another handle onto the same state.
pub struct CircuitBreaker<C: Clock = SystemClock> {
    config: CircuitBreakerConfig,
    inner: Arc<Mutex<BreakerState>>,
    clock: Arc<C>,
}

impl<C: Clock> fmt::Debug for CircuitBreaker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .field("state", &inner.state)
            .field("consecutive_failures", &inner.consecutive_failures)
            .field("success_count", &inner.success_count)
            .finish()
    }
}

impl<C: Clock> Clone for CircuitBreaker<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            inner: Arc::clone(&self.inner),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl CircuitBreaker<SystemClock> {
    /// Create a new circuit breaker using the system clock
    pub fn new(config: CircuitBreakerConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, SystemClock)
    }

    /// Circuit breaker with the default 5 failures / 30 s window
    pub fn with_defaults() -> Self {
        Self::from_parts(CircuitBreakerConfig::default(), SystemClock)
    }
}

impl Default for CircuitBreaker<SystemClock> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl<C: Clock> CircuitBreaker<C> {
    /// Create a new circuit breaker with a custom clock (useful for testing)
    pub fn with_clock(config: CircuitBreakerConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_parts(config, clock))
    }

    fn from_parts(config: CircuitBreakerConfig, clock: C) -> Self {
        Self { config, inner: Arc::new(Mutex::new(BreakerState::closed())), clock: Arc::new(clock) }
    }

    /// Configuration of this breaker
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Ask permission to make a call.
    ///
    /// An open breaker whose reset window has elapsed moves to half-open here
    /// and hands out the single probe permit. The returned permit must be
    /// resolved with [`CallPermit::success`] or [`CallPermit::failure`];
    /// dropping it unresolved only frees the probe slot.
    pub fn try_acquire(&self) -> Result<CallPermit<'_, C>, CircuitOpenError> {
        let mut inner = self.inner.lock();

        match inner.state {
            CircuitState::Closed => Ok(CallPermit::new(self, false)),
            CircuitState::Open => {
                let now = self.clock.now();
                let since_failure = inner
                    .last_failure_at
                    .map_or(Duration::MAX, |at| now.saturating_duration_since(at));

                if since_failure > self.config.reset_window {
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_in_flight = true;
                    info!(
                        consecutive_failures = inner.consecutive_failures,
                        "Circuit breaker half-open, admitting probe"
                    );
                    Ok(CallPermit::new(self, true))
                } else {
                    debug!("Circuit breaker rejecting call - state: open");
                    Err(CircuitOpenError {
                        retry_after: Some(self.config.reset_window.saturating_sub(since_failure)),
                    })
                }
            }
            CircuitState::HalfOpen if inner.probe_in_flight => {
                debug!("Circuit breaker rejecting call - probe already in flight");
                Err(CircuitOpenError { retry_after: None })
            }
            CircuitState::HalfOpen => {
                inner.probe_in_flight = true;
                Ok(CallPermit::new(self, true))
            }
        }
    }

    /// Execute an operation with circuit breaker protection
    ///
    /// A rejected call never invokes `operation`. One `Err` from the operation
    /// counts as one failure.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> ResilienceResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self.try_acquire().map_err(|_| ResilienceError::CircuitOpen)?;

        match operation().await {
            Ok(value) => {
                permit.success();
                Ok(value)
            }
            Err(source) => {
                permit.failure();
                Err(ResilienceError::OperationFailed { source })
            }
        }
    }

    /// Record a successful call
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.success_count += 1;
        inner.consecutive_failures = 0;
        inner.probe_in_flight = false;

        if inner.state != CircuitState::Closed {
            info!(previous = %inner.state, "Circuit breaker closed after successful call");
            inner.state = CircuitState::Closed;
        }
    }

    /// Record a failed call
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.last_failure_at = Some(self.clock.now());
        inner.last_failure_wall = Some(self.clock.system_time());
        inner.probe_in_flight = false;

        match inner.state {
            CircuitState::Closed if inner.consecutive_failures >= self.config.open_threshold => {
                inner.state = CircuitState::Open;
                warn!(
                    consecutive_failures = inner.consecutive_failures,
                    "Circuit breaker opened after consecutive failures"
                );
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                warn!("Circuit breaker re-opened after failed probe");
            }
            _ => {}
        }
    }

    fn release_probe(&self) {
        self.inner.lock().probe_in_flight = false;
    }

    /// Current state of the circuit breaker
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Snapshot of the breaker counters
    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let inner = self.inner.lock();
        CircuitBreakerSnapshot {
            state: inner.state,
            failure_count: inner.consecutive_failures,
            last_failure_time: inner.last_failure_wall.map(DateTime::<Utc>::from),
            success_count: inner.success_count,
        }
    }

    /// Reset the circuit breaker to closed state with zeroed counters
    pub fn reset(&self) {
        *self.inner.lock() = BreakerState::closed();
        info!("Circuit breaker manually reset to closed state");
    }
}

/// Permission to make one call through a [`CircuitBreaker`]
#[must_use = "resolve the permit with success() or failure()"]
pub struct CallPermit<'a, C: Clock> {
    breaker: &'a CircuitBreaker<C>,
    probe: bool,
    resolved: bool,
}

impl<'a, C: Clock> CallPermit<'a, C> {
    fn new(breaker: &'a CircuitBreaker<C>, probe: bool) -> Self {
        Self { breaker, probe, resolved: false }
    }

    /// Whether this call is the half-open probe
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    /// The call succeeded
    pub fn success(mut self) {
        self.resolved = true;
        self.breaker.record_success();
    }

    /// The call failed
    pub fn failure(mut self) {
        self.resolved = true;
        self.breaker.record_failure();
    }
}

impl<C: Clock> Drop for CallPermit<'_, C> {
    fn drop(&mut self) {
        if self.probe && !self.resolved {
            self.breaker.release_probe();
        }
    }
}
