//! # Stateful subscriber that counts dispatch signals per event type.
//!
//! [`DispatchCounters`] is the built-in metrics sink: it keeps one counter per
//! `(SignalKind, event type name)` pair, which covers the sent / published /
//! processed / failed counters tagged by event type.
//!
//! ## Architecture
//! ```text
//!  EventBus / QueueProcessor ── publish(Signal) ──► SignalBus ──► SubscriberSet
//!                                                                     │
//!                                                                     ▼
//!                                     DispatchCounters (HashMap behind Mutex)
//!                                          (kind, event_type) += 1
//! ```
//!
//! ## Example
//! ```no_run
//! # use std::sync::Arc;
//! # use polybus::{DispatchCounters, SignalKind, Subscribe};
//! let counters = Arc::new(DispatchCounters::new());
//! let subs: Vec<Arc<dyn Subscribe>> = vec![counters.clone()];
//! // ... hand `subs` to EventBusBuilder::with_subscribers
//! let failed = counters.count(SignalKind::ConsumerFailed, "OrderPlaced");
//! # let _ = (subs, failed);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::signals::{Signal, SignalKind};
use crate::subscribers::Subscribe;

/// Tag used for signals that carry no event type.
const UNTAGGED: &str = "";

/// Counts signals per kind and event type name.
///
/// Thread-safe and cloneable - clones share the same counters.
#[derive(Clone, Default)]
pub struct DispatchCounters {
    inner: Arc<Mutex<HashMap<(SignalKind, Arc<str>), u64>>>,
}

impl DispatchCounters {
    /// Creates a new, empty set of counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the counter for `kind` tagged with `event_type`.
    pub fn count(&self, kind: SignalKind, event_type: &str) -> u64 {
        self.inner
            .lock()
            .iter()
            .find(|((k, tag), _)| *k == kind && tag.as_ref() == event_type)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    /// Returns the sum of all counters of `kind`, whatever the tag.
    pub fn total(&self, kind: SignalKind) -> u64 {
        self.inner
            .lock()
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, n)| *n)
            .sum()
    }

    /// Returns a snapshot of all counters, sorted by label then tag.
    pub fn snapshot(&self) -> Vec<(SignalKind, Arc<str>, u64)> {
        let mut out: Vec<_> = self
            .inner
            .lock()
            .iter()
            .map(|((k, tag), n)| (*k, Arc::clone(tag), *n))
            .collect();
        out.sort_by(|a, b| (a.0.as_label(), &a.1).cmp(&(b.0.as_label(), &b.1)));
        out
    }

    fn record(&self, signal: &Signal) {
        let tag = signal
            .event_type
            .clone()
            .unwrap_or_else(|| Arc::from(UNTAGGED));
        *self.inner.lock().entry((signal.kind, tag)).or_insert(0) += 1;
    }
}

#[async_trait]
impl Subscribe for DispatchCounters {
    async fn on_signal(&self, signal: &Signal) {
        self.record(signal);
    }

    fn name(&self) -> &'static str {
        "dispatch_counters"
    }

    fn queue_capacity(&self) -> usize {
        4096
    }
}
