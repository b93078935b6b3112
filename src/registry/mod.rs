//! # Consumer registry and type resolution.
//!
//! - [`ConsumerRegistry`] collects `consumer type → event types` at composition time
//! - [`ConsumerTypeResolver`] answers `event type → consumer types` at dispatch time
//! - [`MatchMode`] exact or polymorphic matching
//!
//! ```text
//! register::<C>() ──► ConsumerEntry { handlers, matched } ──► build_resolver(poly)
//!                                 ▲                                 │
//!                                 └──── memoized matches ◄── resolve(&EventType)
//! ```

mod builder;
mod entry;
mod resolver;

pub use builder::ConsumerRegistry;
pub use resolver::{ConsumerTypeResolver, MatchMode};
