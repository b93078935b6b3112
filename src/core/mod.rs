//! Dispatch core: the bus, its builder, and the queue processor.
//!
//! ```text
//! EventBusBuilder::new(cfg)
//!     .add_consumer::<C>()      ──► ConsumerRegistry
//!     .with_subscribers(subs)   ──► SubscriberSet (fed by signal_listener)
//!     .build(provider)          ──► Arc<EventBus>
//!
//! EventBus::send      ──► resolver ──► provider ──► handlers (caller's task)
//! EventBus::publish   ──► EventQueue
//! EventBus::spawn_processor ──► QueueProcessor::run (background task)
//!                                 └─► resolver ──► scope ──► handlers
//! ```
//!
//! Internal modules:
//! - [`config`]: [`Config`] and its defaults;
//! - [`bus`]: [`EventBus`], `send` / `publish`;
//! - [`processor`]: [`QueueProcessor`] drain loop;
//! - [`builder`]: [`EventBusBuilder`];
//! - `report`: log and signal helpers shared by both paths.

mod builder;
mod bus;
mod config;
mod processor;
mod report;

pub use builder::EventBusBuilder;
pub use bus::EventBus;
pub use config::Config;
pub use processor::QueueProcessor;
