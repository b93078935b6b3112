//! Error types used by the dispatch core and by consumers.
//!
//! - [`ConsumeError`]: errors returned by consumer handlers.
//! - [`BusError`]: errors surfaced by [`EventBus::send`](crate::EventBus::send) and
//!   [`EventBus::publish`](crate::EventBus::publish).
//! - [`QueueError`]: errors of the events queue writer side.
//! - [`ProviderError`]: failures of the instance-resolution collaborator.
//! - [`ContainerError`], [`BuildError`]: registration-time failures.
//!
//! Every enum provides `as_label` (stable snake_case) for logs/metrics.

use std::any::Any;
use std::fmt;

use thiserror::Error;

use crate::consumers::ConsumerType;
use crate::provider::Lifetime;

/// # Errors produced by consumer handlers.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsumeError {
    /// Handling failed.
    #[error("consumer failed: {reason}")]
    Fail {
        /// The underlying error message.
        reason: String,
    },

    /// Handler observed cancellation and stopped.
    #[error("context cancelled")]
    Canceled,
}

impl ConsumeError {
    /// Shorthand for [`ConsumeError::Fail`] from anything printable.
    ///
    /// # Example
    /// ```
    /// use polybus::ConsumeError;
    ///
    /// let err = ConsumeError::fail("smtp down");
    /// assert_eq!(err.to_string(), "consumer failed: smtp down");
    /// ```
    pub fn fail(reason: impl fmt::Display) -> Self {
        ConsumeError::Fail {
            reason: reason.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConsumeError::Fail { .. } => "consumer_failed",
            ConsumeError::Canceled => "consumer_canceled",
        }
    }
}

/// One failed consumer invocation.
#[derive(Debug, Clone)]
pub struct ConsumerFailure {
    /// Consumer type whose handler failed.
    pub consumer: ConsumerType,
    /// Error returned by the handler.
    pub error: ConsumeError,
}

impl fmt::Display for ConsumerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.consumer.name(), self.error)
    }
}

/// # Errors produced by the events queue.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The reading side of the queue is gone.
    #[error("events queue is closed")]
    Closed,

    /// The caller's cancellation token fired before the write.
    #[error("enqueue cancelled")]
    Canceled,
}

impl QueueError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            QueueError::Closed => "queue_closed",
            QueueError::Canceled => "queue_canceled",
        }
    }
}

/// # Errors produced by a [`ConsumerProvider`](crate::ConsumerProvider).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Instances of a consumer type could not be produced.
    #[error("cannot resolve consumer {consumer}: {reason}")]
    Resolve {
        /// Consumer type name.
        consumer: &'static str,
        /// The underlying error message.
        reason: String,
    },

    /// A resolution scope could not be created.
    #[error("cannot create resolution scope: {reason}")]
    Scope {
        /// The underlying error message.
        reason: String,
    },
}

impl ProviderError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ProviderError::Resolve { .. } => "provider_resolve",
            ProviderError::Scope { .. } => "provider_scope",
        }
    }
}

/// # Errors produced by the event bus.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BusError {
    /// `publish` was called while the events queue is disabled.
    #[error("the background events queue is disabled")]
    QueueDisabled,

    /// The event could not be enqueued.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// Consumer instances could not be resolved.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A consumer failed (single consumer, or first failure in sequential mode).
    #[error("consumer {consumer} failed: {source}")]
    Consumer {
        /// Consumer type whose handler failed.
        consumer: ConsumerType,
        /// Error returned by the handler.
        #[source]
        source: ConsumeError,
    },

    /// One or more consumers failed during a parallel fan-out.
    #[error("{} consumer(s) failed: {}", .0.len(), join_failures(.0))]
    Consumers(Vec<ConsumerFailure>),
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use polybus::BusError;
    ///
    /// assert_eq!(BusError::QueueDisabled.as_label(), "bus_queue_disabled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::QueueDisabled => "bus_queue_disabled",
            BusError::Queue(_) => "bus_queue",
            BusError::Provider(_) => "bus_provider",
            BusError::Consumer { .. } => "bus_consumer_failed",
            BusError::Consumers(_) => "bus_consumers_failed",
        }
    }

    /// Returns every consumer failure carried by this error.
    pub fn failures(&self) -> Vec<ConsumerFailure> {
        match self {
            BusError::Consumers(all) => all.clone(),
            BusError::Consumer { consumer, source } => vec![ConsumerFailure {
                consumer: *consumer,
                error: source.clone(),
            }],
            _ => Vec::new(),
        }
    }
}

fn join_failures(failures: &[ConsumerFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// # Errors produced while registering consumers into a [`Container`](crate::Container).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    /// The consumer type is already registered with another lifetime.
    #[error("consumer {consumer} is registered as {registered:?}, not {requested:?}")]
    LifetimeMismatch {
        /// Consumer type name.
        consumer: &'static str,
        /// Lifetime already on record.
        registered: Lifetime,
        /// Lifetime of the rejected registration.
        requested: Lifetime,
    },
}

impl ContainerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ContainerError::LifetimeMismatch { .. } => "container_lifetime_mismatch",
        }
    }
}

/// # Errors produced by [`EventBusBuilder`](crate::EventBusBuilder).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A registered consumer type has no registration in the container.
    #[error("event consumer {consumer} must be registered in the container")]
    ConsumerNotProvided {
        /// Consumer type name.
        consumer: &'static str,
    },
}

impl BuildError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BuildError::ConsumerNotProvided { .. } => "build_consumer_not_provided",
        }
    }
}
