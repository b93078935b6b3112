//! # Broadcast channel for dispatch signals.
//!
//! [`SignalBus`] is a thin wrapper around [`tokio::sync::broadcast`] that lets the
//! event bus, the queue processor and subscriber workers report what they did
//! without ever waiting on whoever listens.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                 Listener (one):
//!   EventBus::send     ──┐
//!   EventBus::publish  ──┼──────► SignalBus ───► signal_listener ────► SubscriberSet
//!   QueueProcessor     ──┤      (broadcast)      (spawned by builder)
//!   SubscriberSet      ──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls `broadcast::Sender::send`.
//! - **Bounded capacity**: a single ring buffer stores recent signals for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: signals are lost if there are no active receivers at send time.

use tokio::sync::broadcast;

use super::signal::Signal;

/// Broadcast channel for dispatch signals.
///
/// Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct SignalBus {
    tx: broadcast::Sender<Signal>,
}

impl SignalBus {
    /// Creates a new bus with the given channel capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Signal>(capacity);
        Self { tx }
    }

    /// Publishes a signal to all active receivers.
    ///
    /// If there are no receivers, the signal is dropped.
    pub fn publish(&self, sig: Signal) {
        let _ = self.tx.send(sig);
    }

    /// Creates a new receiver that will observe subsequent signals.
    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::SignalKind;

    #[tokio::test]
    async fn test_receiver_sees_signals_after_subscribe() {
        let bus = SignalBus::new(8);
        bus.publish(Signal::new(SignalKind::EventSent));

        let mut rx = bus.subscribe();
        bus.publish(Signal::new(SignalKind::EventPublished).with_event_type("Ping"));

        let sig = rx.recv().await.expect("signal");
        assert_eq!(sig.kind, SignalKind::EventPublished);
        assert_eq!(sig.event_type.as_deref(), Some("Ping"));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let bus = SignalBus::new(0);
        bus.publish(Signal::new(SignalKind::EventSent));
    }
}
