//! # Signal subscriber trait.
//!
//! Provides [`Subscribe`], the extension point for plugging metrics, tracing or
//! alerting sinks into the dispatch core.
//!
//! Each subscriber gets:
//! - **Dedicated worker task** (runs independently)
//! - **Per-subscriber bounded queue** (capacity via [`Subscribe::queue_capacity`])
//! - **Panic isolation** (panics are caught and reported as `SignalKind::SubscriberPanicked`)
//!
//! ## Architecture
//! ```text
//! SubscriberSet ──► [bounded queue] ──► worker task ──► subscriber.on_signal()
//!                                    └─► panic caught → SignalKind::SubscriberPanicked
//! ```
//!
//! ## Rules
//! - A slow subscriber only affects its own queue.
//! - Queue overflow drops the signal **for this subscriber only** and publishes
//!   `SignalKind::SubscriberOverflow`; other subscribers are unaffected.
//! - Signals are processed sequentially (FIFO) per subscriber.
//! - Subscribers never block event dispatch.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use polybus::{Signal, SignalKind, Subscribe};
//!
//! struct Alerts;
//!
//! #[async_trait]
//! impl Subscribe for Alerts {
//!     async fn on_signal(&self, sig: &Signal) {
//!         if matches!(sig.kind, SignalKind::QueueLoopFailed) {
//!             // page someone
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "alerts" }
//! }
//! ```

use async_trait::async_trait;

use crate::signals::Signal;

/// Signal subscriber for dispatch observability.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single signal.
    ///
    /// Called from a dedicated worker task, never from the dispatching context.
    async fn on_signal(&self, signal: &Signal);

    /// Returns the subscriber name used in logs and overflow/panic signals.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the preferred queue capacity for this subscriber.
    ///
    /// The runtime clamps capacity to a minimum of 1.
    ///
    /// Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
