//! # Signal subscribers.
//!
//! This module provides the [`Subscribe`] trait and built-in implementations
//! for handling dispatch signals broadcast through the [`SignalBus`](crate::signals::SignalBus).
//!
//! ## Architecture
//! ```text
//! Signal flow:
//!   EventBus / QueueProcessor ── publish(Signal) ──► SignalBus ──► SubscriberSet
//!                                                                     │
//!                                                     ┌───────────────┼──────────┐
//!                                                     ▼               ▼          ▼
//!                                              DispatchCounters   LogWriter    Custom
//! ```
//!
//! ## Subscriber types
//! - **Passive subscribers** - observe and react to signals (logging, alerts)
//! - **Stateful subscribers** - maintain counters based on signals ([`DispatchCounters`])

mod counters;
#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

pub use counters::DispatchCounters;
#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
