//! # Dispatch configuration.
//!
//! Provides [`Config`], the settings read by [`EventBusBuilder`](crate::EventBusBuilder).
//! Loading it from files or the environment is left to the embedding application.
//!
//! ## Sentinel values
//! - `concurrent_task_limit = 0` → treated as 1 (the gate always admits one handler)
//! - `signal_capacity = 0` → treated as 1
//!
//! ## Example
//! ```
//! use std::time::Duration;
//! use polybus::{Config, ProcessingMode};
//!
//! let mut cfg = Config::default();
//! cfg.use_event_polymorphism = true;
//! cfg.queue_processing_mode = ProcessingMode::Parallel;
//! cfg.concurrent_task_limit = 4;
//! cfg.queue_tick_rate = Duration::from_millis(5);
//!
//! assert_eq!(cfg.gate_size(), 4);
//! ```

use std::time::Duration;

use crate::policies::ProcessingMode;

/// Event bus configuration.
///
/// ## Field semantics
/// - `use_event_polymorphism`: match consumers declared for supertypes/subtypes too
/// - `use_events_queue`: allow `publish` and the queue processor
/// - `use_error_queue`: record failed queued invocations as [`FailedEvent`](crate::FailedEvent)s
/// - `queue_tick_rate`: pause after a drain pass
/// - `error_tick_rate`: pause after a loop-level failure
/// - `consumer_execution_mode`: fan-out mode of `send`
/// - `queue_processing_mode`: fan-out mode of the queue processor
/// - `concurrent_task_limit`: gate size for parallel queue processing
/// - `signal_capacity`: ring buffer size of the signal broadcast
#[derive(Clone, Debug)]
pub struct Config {
    /// Selects polymorphic over exact matching.
    pub use_event_polymorphism: bool,

    /// Whether `publish` is permitted.
    ///
    /// When `false`, `publish` fails with `BusError::QueueDisabled` and
    /// `spawn_processor` does nothing.
    pub use_events_queue: bool,

    /// Whether failed queued invocations are recorded.
    ///
    /// Failures are always logged and signalled; this only controls the
    /// `EventQueue::failures` list.
    pub use_error_queue: bool,

    /// Pause after a successful drain pass.
    pub queue_tick_rate: Duration,

    /// Pause after a drain pass that failed outside of any handler.
    pub error_tick_rate: Duration,

    /// How `send` runs several consumers.
    pub consumer_execution_mode: ProcessingMode,

    /// How the queue processor runs consumers of a drained event.
    pub queue_processing_mode: ProcessingMode,

    /// Maximum number of handlers running at once in parallel queue mode.
    pub concurrent_task_limit: usize,

    /// Capacity of the signal broadcast channel.
    ///
    /// Lagging subscribers skip the oldest signals.
    pub signal_capacity: usize,
}

impl Config {
    /// Gate size for parallel queue processing, at least 1.
    #[inline]
    pub fn gate_size(&self) -> usize {
        self.concurrent_task_limit.max(1)
    }

    /// Signal channel capacity, at least 1.
    #[inline]
    pub fn signal_capacity_clamped(&self) -> usize {
        self.signal_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `use_event_polymorphism = false`
    /// - `use_events_queue = true`
    /// - `use_error_queue = false`
    /// - `queue_tick_rate = 20ms`, `error_tick_rate = 20ms`
    /// - `consumer_execution_mode = Parallel`
    /// - `queue_processing_mode = Sequential`
    /// - `concurrent_task_limit = 16`
    /// - `signal_capacity = 1024`
    fn default() -> Self {
        Self {
            use_event_polymorphism: false,
            use_events_queue: true,
            use_error_queue: false,
            queue_tick_rate: Duration::from_millis(20),
            error_tick_rate: Duration::from_millis(20),
            consumer_execution_mode: ProcessingMode::Parallel,
            queue_processing_mode: ProcessingMode::Sequential,
            concurrent_task_limit: 16,
            signal_capacity: 1024,
        }
    }
}
