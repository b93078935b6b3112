//! # Dispatch signals emitted by the bus and the queue processor.
//!
//! A [`Signal`] is the observability record of something the dispatch core did:
//! an event was sent or published, a queued event was processed, a consumer failed
//! or had no handler, the processor loop hit an error. Signals are what metrics and
//! log sinks consume; they never influence dispatch itself.
//!
//! The [`SignalKind`] enum classifies signals across three groups:
//! - **Dispatch signals**: `EventSent`, `EventPublished`, `EventProcessed`
//! - **Failure signals**: `ConsumerFailed`, `ConsumerMissing`, `QueueLoopFailed`
//! - **Runtime signals**: processor lifecycle and subscriber health
//!
//! ## Ordering guarantees
//! Each signal has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when signals are delivered out of order.
//!
//! ## Example
//! ```rust
//! use polybus::{Signal, SignalKind};
//!
//! let sig = Signal::new(SignalKind::ConsumerFailed)
//!     .with_event_type("OrderPlaced")
//!     .with_consumer("Mailer")
//!     .with_reason("smtp down");
//!
//! assert_eq!(sig.kind, SignalKind::ConsumerFailed);
//! assert_eq!(sig.event_type.as_deref(), Some("OrderPlaced"));
//! assert_eq!(sig.consumer.as_deref(), Some("Mailer"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for signal ordering.
static SIGNAL_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of dispatch signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    // === Dispatch signals ===
    /// An event went through the immediate `send` path.
    ///
    /// Sets:
    /// - `event_type`: event type name
    EventSent,

    /// An event was appended to the events queue.
    ///
    /// Sets:
    /// - `event_type`: event type name
    EventPublished,

    /// A queued event was drained and its consumers were started.
    ///
    /// Sets:
    /// - `event_type`: event type name
    EventProcessed,

    // === Failure signals ===
    /// A queued consumer returned an error.
    ///
    /// Sets:
    /// - `event_type`: event type name
    /// - `consumer`: consumer type name
    /// - `reason`: error message
    ConsumerFailed,

    /// A resolved consumer has no handler usable for the event.
    ///
    /// Sets:
    /// - `event_type`: event type name
    /// - `consumer`: consumer type name
    ConsumerMissing,

    /// The processor loop failed outside of any consumer call.
    ///
    /// Sets:
    /// - `reason`: error message
    QueueLoopFailed,

    // === Runtime signals ===
    /// The queue processor entered its loop.
    ProcessorStarted,

    /// The queue processor left its loop (cancellation observed).
    ProcessorStopped,

    /// Subscriber dropped a signal (queue full or worker closed).
    ///
    /// Sets:
    /// - `consumer`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,

    /// Subscriber panicked during signal processing.
    ///
    /// Sets:
    /// - `consumer`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,
}

impl SignalKind {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SignalKind::EventSent => "bus_sent",
            SignalKind::EventPublished => "bus_published",
            SignalKind::EventProcessed => "bus_processed",
            SignalKind::ConsumerFailed => "bus_failed",
            SignalKind::ConsumerMissing => "bus_consumer_missing",
            SignalKind::QueueLoopFailed => "bus_loop_failed",
            SignalKind::ProcessorStarted => "processor_started",
            SignalKind::ProcessorStopped => "processor_stopped",
            SignalKind::SubscriberOverflow => "subscriber_overflow",
            SignalKind::SubscriberPanicked => "subscriber_panicked",
        }
    }
}

/// Dispatch signal with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`SignalKind`]
#[derive(Clone, Debug)]
pub struct Signal {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Signal classification.
    pub kind: SignalKind,
    /// Name of the event type the signal is tagged with.
    pub event_type: Option<Arc<str>>,
    /// Name of the consumer type (or subscriber) involved.
    pub consumer: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Signal {
    /// Creates a new signal of the given kind with current timestamp and next sequence number.
    pub fn new(kind: SignalKind) -> Self {
        Self {
            seq: SIGNAL_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            event_type: None,
            consumer: None,
            reason: None,
        }
    }

    /// Attaches the event type tag.
    #[inline]
    pub fn with_event_type(mut self, name: impl Into<Arc<str>>) -> Self {
        self.event_type = Some(name.into());
        self
    }

    /// Attaches a consumer (or subscriber) name.
    #[inline]
    pub fn with_consumer(mut self, name: impl Into<Arc<str>>) -> Self {
        self.consumer = Some(name.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow signal.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Signal::new(SignalKind::SubscriberOverflow)
            .with_consumer(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic signal.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Signal::new(SignalKind::SubscriberPanicked)
            .with_consumer(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, SignalKind::SubscriberOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Signal::new(SignalKind::EventSent);
        let b = Signal::new(SignalKind::EventSent);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_overflow_signal_carries_subscriber() {
        let sig = Signal::subscriber_overflow("metrics", "full");
        assert!(sig.is_subscriber_overflow());
        assert_eq!(sig.consumer.as_deref(), Some("metrics"));
        assert_eq!(sig.reason.as_deref(), Some("full"));
    }
}
