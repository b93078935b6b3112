//! # Events queue for deferred dispatch.
//!
//! [`EventQueue`] is an unbounded FIFO between publishers and the queue processor,
//! plus an append-only list of [`FailedEvent`]s.
//!
//! ## Architecture
//! ```text
//! publish ──► enqueue ──► [unbounded mpsc] ──► drain() ──► QueueProcessor
//!                │                                           │
//!                └──► Notify (wakes an idle processor)       └──► record_failure ──► failures()
//! ```
//!
//! ## Rules
//! - Any number of concurrent writers.
//! - One reader: each event is handed to exactly one `drain` pass.
//! - A wake-up sent while the reader is busy is kept, so the next `ready()` returns at once.
//! - Entries not drained stay in the queue when the processor stops.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;

use crate::error::QueueError;
use crate::events::AnyEvent;
use crate::queue::FailedEvent;

/// Unbounded FIFO of pending events plus the failure list.
pub struct EventQueue {
    tx: mpsc::UnboundedSender<AnyEvent>,
    rx: Mutex<mpsc::UnboundedReceiver<AnyEvent>>,
    pending: AtomicUsize,
    ready: Notify,
    failures: Mutex<Vec<FailedEvent>>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
            pending: AtomicUsize::new(0),
            ready: Notify::new(),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Appends an event.
    ///
    /// Fails with [`QueueError::Canceled`] if `ctx` is already cancelled; nothing is
    /// written in that case.
    pub async fn enqueue(&self, event: AnyEvent, ctx: &CancellationToken) -> Result<(), QueueError> {
        if ctx.is_cancelled() {
            return Err(QueueError::Canceled);
        }
        self.pending.fetch_add(1, Ordering::AcqRel);
        if self.tx.send(event).is_err() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            return Err(QueueError::Closed);
        }
        self.ready.notify_one();
        Ok(())
    }

    /// Takes the oldest pending event, if any.
    pub fn try_dequeue(&self) -> Option<AnyEvent> {
        let event = self.rx.lock().try_recv().ok()?;
        self.pending.fetch_sub(1, Ordering::AcqRel);
        Some(event)
    }

    /// Lazily takes pending events until the queue is empty.
    ///
    /// Every call starts a new pass; events taken by one pass are gone for the next.
    pub fn drain(&self) -> Drain<'_> {
        Drain { queue: self }
    }

    /// Completes once an event was enqueued since the last wake-up.
    pub async fn ready(&self) {
        self.ready.notified().await;
    }

    /// Number of events waiting to be drained.
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// True if nothing is waiting to be drained.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a failure record.
    ///
    /// A timestamp older than the last record (wall clock stepping back) is raised
    /// to the last record's timestamp.
    pub fn record_failure(&self, mut failed: FailedEvent) {
        let mut failures = self.failures.lock();
        if let Some(last) = failures.last() {
            if failed.at < last.at {
                failed.at = last.at;
            }
        }
        failures.push(failed);
    }

    /// Snapshot of every failure recorded so far, oldest first.
    pub fn failures(&self) -> Vec<FailedEvent> {
        self.failures.lock().clone()
    }

    /// Number of failure records.
    pub fn failure_count(&self) -> usize {
        self.failures.lock().len()
    }
}

/// Draining iterator returned by [`EventQueue::drain`].
pub struct Drain<'a> {
    queue: &'a EventQueue,
}

impl Iterator for Drain<'_> {
    type Item = AnyEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.queue.try_dequeue()
    }
}
