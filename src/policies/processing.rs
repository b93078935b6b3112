//! # Fan-out modes for consumer execution.
//!
//! [`ProcessingMode`] decides how the handlers resolved for one event are run.
//!
//! **Immediate path** (`EventBus::send`, `consumer_execution_mode`):
//! ```text
//! ProcessingMode::Sequential  → await C1, then C2, ...; first error stops the rest
//! ProcessingMode::Parallel    → start all, await all; errors are aggregated
//! ```
//!
//! **Queued path** (queue processor, `queue_processing_mode`):
//! ```text
//! ProcessingMode::Sequential  → await each handler before the next one
//! ProcessingMode::Parallel    → acquire a gate permit, spawn, move on
//! ```

/// How handlers resolved for one event are executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessingMode {
    /// One handler at a time, in resolver order.
    Sequential,
    /// All handlers started without waiting on each other.
    Parallel,
}

impl ProcessingMode {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ProcessingMode::Sequential => "sequential",
            ProcessingMode::Parallel => "parallel",
        }
    }
}

impl Default for ProcessingMode {
    /// Returns [`ProcessingMode::Parallel`].
    fn default() -> Self {
        ProcessingMode::Parallel
    }
}
