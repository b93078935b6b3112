//! # Non-blocking signal fan-out to multiple subscribers.
//!
//! Provides [`SubscriberSet`], which distributes signals to multiple subscribers
//! concurrently without blocking the dispatch path.
//!
//! ## Architecture
//! ```text
//! emit(signal)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_signal()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     ├──► [queue 2] ──► worker 2 ──► subscriber2.on_signal()
//!     │    (bounded)
//!     └──► [queue N] ──► worker N ──► subscriberN.on_signal()
//!          (bounded)
//! ```
//!
//! ## Rules
//! - **No cross-subscriber ordering**: subscriber A may process signal N while B processes N+5
//! - **Overflow**: signal dropped for that subscriber only, `SubscriberOverflow` published
//! - **Non-blocking**: `emit()` returns immediately (uses `try_send`)
//! - **Per-subscriber FIFO**: each subscriber sees signals in order
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a subscriber uses `Arc<Mutex<T>>` and panics while holding the lock.

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::error::panic_reason;
use crate::signals::{Signal, SignalBus};
use crate::subscribers::Subscribe;

/// Per-subscriber channel metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Signal>>,
}

/// Fan-out coordinator for multiple signal subscribers.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: SignalBus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: SignalBus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Signal>>(cap);
            let s = Arc::clone(&sub);
            let bus_for_worker = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(sig) = rx.recv().await {
                    let fut = s.on_signal(sig.as_ref());

                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        let info = panic_reason(&*panic_err);
                        tracing::warn!(subscriber = s.name(), panic = %info, "subscriber panicked");
                        bus_for_worker.publish(Signal::subscriber_panicked(s.name(), info));
                    }
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }
        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Emits a signal to all subscribers (clones the signal once).
    pub fn emit(&self, signal: &Signal) {
        self.emit_arc(Arc::new(signal.clone()));
    }

    /// Emits a pre-allocated `Arc<Signal>` to all subscribers.
    ///
    /// Overflow signals are not re-published when they themselves overflow.
    pub fn emit_arc(&self, signal: Arc<Signal>) {
        let is_overflow = signal.is_subscriber_overflow();

        for channel in &self.channels {
            match channel.sender.try_send(Arc::clone(&signal)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    if !is_overflow {
                        self.bus
                            .publish(Signal::subscriber_overflow(channel.name, "full"));
                    }
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    if !is_overflow {
                        self.bus
                            .publish(Signal::subscriber_overflow(channel.name, "closed"));
                    }
                }
            }
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Gracefully shuts down all subscriber workers.
    ///
    /// 1. Drops all channel senders (workers see channel closed)
    /// 2. Awaits all worker tasks to finish
    pub async fn shutdown(self) {
        drop(self.channels);

        for h in self.workers {
            let _ = h.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::SignalKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Count(Arc<AtomicUsize>);

    #[async_trait]
    impl Subscribe for Count {
        async fn on_signal(&self, _signal: &Signal) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn name(&self) -> &'static str {
            "count"
        }
    }

    struct Panics;

    #[async_trait]
    impl Subscribe for Panics {
        async fn on_signal(&self, _signal: &Signal) {
            panic!("boom");
        }
        fn name(&self) -> &'static str {
            "panics"
        }
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_signal() {
        let bus = SignalBus::new(16);
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        let set = SubscriberSet::new(
            vec![Arc::new(Count(a.clone())), Arc::new(Count(b.clone()))],
            bus,
        );
        assert_eq!(set.len(), 2);

        set.emit(&Signal::new(SignalKind::EventSent));
        set.emit(&Signal::new(SignalKind::EventPublished));
        set.shutdown().await;

        assert_eq!(a.load(Ordering::SeqCst), 2);
        assert_eq!(b.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_panic_is_reported_on_bus() {
        let bus = SignalBus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Panics)], bus);

        set.emit(&Signal::new(SignalKind::EventSent));

        let sig = rx.recv().await.expect("panic signal");
        assert_eq!(sig.kind, SignalKind::SubscriberPanicked);
        assert_eq!(sig.consumer.as_deref(), Some("panics"));
        assert_eq!(sig.reason.as_deref(), Some("boom"));
        set.shutdown().await;
    }
}
