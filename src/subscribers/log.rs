//! # LogWriter - signal printer through `tracing`
//!
//! A minimal subscriber that writes incoming [`Signal`]s as `tracing` records.
//! Use it for debugging or demos; production sinks should implement [`Subscribe`].
//!
//! ## Example output (with a fmt subscriber installed)
//! ```text
//! INFO polybus: [sent] event=Ping
//! INFO polybus: [published] event=OrderPlaced
//! WARN polybus: [failed] event=OrderPlaced consumer=Mailer err="smtp down"
//! WARN polybus: [missing-handler] event=Shape consumer=CircleOnly
//! ```

use async_trait::async_trait;

use crate::signals::{Signal, SignalKind};
use crate::subscribers::Subscribe;

/// Signal writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_signal(&self, s: &Signal) {
        let event = s.event_type.as_deref().unwrap_or("-");
        let consumer = s.consumer.as_deref().unwrap_or("-");
        let reason = s.reason.as_deref().unwrap_or("-");

        match s.kind {
            SignalKind::EventSent => {
                tracing::info!(target: "polybus", "[sent] event={event}");
            }
            SignalKind::EventPublished => {
                tracing::info!(target: "polybus", "[published] event={event}");
            }
            SignalKind::EventProcessed => {
                tracing::info!(target: "polybus", "[processed] event={event}");
            }
            SignalKind::ConsumerFailed => {
                tracing::warn!(target: "polybus", "[failed] event={event} consumer={consumer} err={reason:?}");
            }
            SignalKind::ConsumerMissing => {
                tracing::warn!(target: "polybus", "[missing-handler] event={event} consumer={consumer}");
            }
            SignalKind::QueueLoopFailed => {
                tracing::warn!(target: "polybus", "[loop-failed] err={reason:?}");
            }
            SignalKind::ProcessorStarted => {
                tracing::info!(target: "polybus", "[processor-started]");
            }
            SignalKind::ProcessorStopped => {
                tracing::info!(target: "polybus", "[processor-stopped]");
            }
            SignalKind::SubscriberOverflow => {
                tracing::warn!(target: "polybus", "[subscriber-overflow] subscriber={consumer} reason={reason}");
            }
            SignalKind::SubscriberPanicked => {
                tracing::warn!(target: "polybus", "[subscriber-panicked] subscriber={consumer} info={reason:?}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
