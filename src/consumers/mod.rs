//! # Consumer capability model.
//!
//! - [`Consume<E>`] handler contract for one event type
//! - [`Consumer`] explicit list of the event types a type handles
//! - [`Handlers`] collector passed to [`Consumer::handlers`]
//! - [`ConsumerType`] stable identifier used by the registry and resolver
//!
//! Capability discovery happens once, at registration; dispatch only looks up the
//! binders collected here.

mod consume;
mod consumer;

pub use consume::Consume;
pub(crate) use consumer::Binder;
pub use consumer::{ConsumeFuture, Consumer, ConsumerType, Handlers};
