//! Dispatch signals: types and broadcast bus.
//!
//! This module groups the observability **data model** and the **bus** used to
//! report what the dispatch core does (sends, publishes, processed events,
//! consumer failures, loop errors).
//!
//! ## Contents
//! - [`SignalKind`], [`Signal`] classification and metadata
//! - [`SignalBus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `EventBus`, `QueueProcessor`, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the listener spawned by `EventBusBuilder`, which fans out to `SubscriberSet`.

mod bus;
mod signal;

pub use bus::SignalBus;
pub use signal::{Signal, SignalKind};
