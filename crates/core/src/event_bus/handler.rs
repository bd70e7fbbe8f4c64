use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use clinix_domain::DomainEvent;

/// Error returned by a handler attempt
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A subscriber to one or more event names
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle one delivery. Returning `Err` schedules a retry.
    async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError>;
}

/// Handler backed by an async closure, see [`handler_fn`]
pub struct FnHandler<F> {
    f: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

/// Wrap an async closure as an [`EventHandler`].
///
/// The closure receives its own copy of the event.
///
/// ```ignore
/// bus.subscribe(
///     "appointment.completed",
///     handler_fn(|event| async move {
///         tracing::info!(aggregate_id = event.aggregate_id(), "creating clinical record");
///         Ok(())
///     }),
///     "clinical",
/// );
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(DomainEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(DomainEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError> {
        (self.f)(event.clone()).await
    }
}
