use std::time::SystemTime;

use crate::consumers::ConsumerType;
use crate::error::ConsumeError;
use crate::events::AnyEvent;

/// Record of a queued consumer invocation that failed.
///
/// Produced by the queue processor when the error queue is enabled.
#[derive(Clone, Debug)]
pub struct FailedEvent {
    /// The event as it was published.
    pub event: AnyEvent,
    /// Error returned by the handler.
    pub error: ConsumeError,
    /// Consumer type whose handler failed, when known.
    pub consumer: Option<ConsumerType>,
    /// When the failure was recorded; non-decreasing across records of one queue.
    pub at: SystemTime,
}

impl FailedEvent {
    /// Creates a record stamped with the current time.
    pub fn new(event: AnyEvent, error: ConsumeError, consumer: Option<ConsumerType>) -> Self {
        Self {
            event,
            error,
            consumer,
            at: SystemTime::now(),
        }
    }
}
