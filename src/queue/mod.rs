//! # Deferred delivery.
//!
//! - [`EventQueue`] unbounded FIFO filled by `publish`, drained by the queue processor
//! - [`FailedEvent`] record of a queued consumer failure
//! - [`Drain`] destructive iterator over the pending events

mod failed;
mod queue;

pub use failed::FailedEvent;
pub use queue::{Drain, EventQueue};
