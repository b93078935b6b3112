//! Execution policies.
//!
//! ## Contents
//! - [`ProcessingMode`] sequential or parallel fan-out of handlers
//!
//! ## Quick wiring
//! ```text
//! Config { consumer_execution_mode, queue_processing_mode, concurrent_task_limit }
//!      ├─► EventBus::send uses consumer_execution_mode
//!      └─► QueueProcessor uses queue_processing_mode (+ gate of concurrent_task_limit)
//! ```

mod processing;

pub use processing::ProcessingMode;
