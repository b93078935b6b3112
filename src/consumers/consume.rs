//! # Handler contract for one event type.
//!
//! A consumer supports an event type `E` by implementing [`Consume<E>`]. A single
//! type may implement it for several unrelated event types; each implementation is
//! independent and none of the event types need to share a hierarchy.
//!
//! Handlers receive a [`CancellationToken`] and should return
//! [`ConsumeError::Canceled`] (or simply stop) once it fires.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ConsumeError;
use crate::events::Event;

/// # Asynchronous handler of events of type `E`.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use polybus::{Consume, ConsumeError, Event};
///
/// struct Ping;
/// impl Event for Ping {}
///
/// struct Pong;
/// impl Event for Pong {}
///
/// struct Echo;
///
/// #[async_trait]
/// impl Consume<Ping> for Echo {
///     async fn consume(&self, _event: &Ping, _ctx: CancellationToken) -> Result<(), ConsumeError> {
///         Ok(())
///     }
/// }
///
/// #[async_trait]
/// impl Consume<Pong> for Echo {
///     async fn consume(&self, _event: &Pong, ctx: CancellationToken) -> Result<(), ConsumeError> {
///         if ctx.is_cancelled() {
///             return Err(ConsumeError::Canceled);
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Consume<E: Event>: Send + Sync + 'static {
    /// Handles one event.
    ///
    /// An `Err` returned from the immediate path reaches the caller of
    /// [`EventBus::send`](crate::EventBus::send); from the queued path it is logged
    /// and optionally recorded as a [`FailedEvent`](crate::FailedEvent).
    async fn consume(&self, event: &E, ctx: CancellationToken) -> Result<(), ConsumeError>;
}
