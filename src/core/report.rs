//! Signal and log helpers shared by the immediate and queued dispatch paths.

use crate::consumers::ConsumerType;
use crate::error::{ConsumeError, ProviderError};
use crate::events::AnyEvent;
use crate::signals::{Signal, SignalBus, SignalKind};

/// Publishes `EventSent`.
pub(crate) fn publish_sent(signals: &SignalBus, event: &AnyEvent) {
    signals.publish(Signal::new(SignalKind::EventSent).with_event_type(event.name()));
}

/// Publishes `EventPublished`.
pub(crate) fn publish_published(signals: &SignalBus, event: &AnyEvent) {
    signals.publish(Signal::new(SignalKind::EventPublished).with_event_type(event.name()));
}

/// Publishes `EventProcessed`.
pub(crate) fn publish_processed(signals: &SignalBus, event: &AnyEvent) {
    signals.publish(Signal::new(SignalKind::EventProcessed).with_event_type(event.name()));
}

/// Logs and publishes `ConsumerMissing`; the consumer is skipped by the caller.
pub(crate) fn missing_handler(signals: &SignalBus, consumer: ConsumerType, event: &AnyEvent) {
    tracing::error!(
        consumer = consumer.name(),
        event = event.name(),
        "consumer has no handler for the event, skipped"
    );
    signals.publish(
        Signal::new(SignalKind::ConsumerMissing)
            .with_event_type(event.name())
            .with_consumer(consumer.name()),
    );
}

/// Logs and publishes `ConsumerFailed` for a queued invocation.
pub(crate) fn consumer_failed(
    signals: &SignalBus,
    consumer: ConsumerType,
    event: &AnyEvent,
    err: &ConsumeError,
) {
    tracing::error!(
        consumer = consumer.name(),
        event = event.name(),
        error = %err,
        "queued consumer failed"
    );
    signals.publish(
        Signal::new(SignalKind::ConsumerFailed)
            .with_event_type(event.name())
            .with_consumer(consumer.name())
            .with_reason(err.to_string()),
    );
}

/// Logs and publishes `QueueLoopFailed`.
pub(crate) fn loop_failed(signals: &SignalBus, err: &ProviderError) {
    tracing::error!(error = %err, label = err.as_label(), "queue processing pass failed");
    signals.publish(Signal::new(SignalKind::QueueLoopFailed).with_reason(err.to_string()));
}
