//! # Consumer registry.
//!
//! [`ConsumerRegistry`] accumulates, for each registered consumer type, the event
//! types it declared through [`Consumer::handlers`]. It is filled during composition
//! and then frozen into a [`ConsumerTypeResolver`] with [`build_resolver`].
//!
//! ## Rules
//! - A consumer declaring no handler is not recorded.
//! - Registering a type again adds only the event types it did not declare before.
//! - Resolvers share the entries of the registry they came from, so polymorphic
//!   memoization done by one resolver is seen by the others. Registering after a
//!   resolver was built is not supported: that resolver will not see new types.
//!
//! [`build_resolver`]: ConsumerRegistry::build_resolver
//!
//! ## Example
//! ```
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use polybus::{Consume, ConsumeError, Consumer, ConsumerRegistry, ConsumerType, Event, EventType, Handlers};
//!
//! struct Ping;
//! impl Event for Ping {}
//!
//! struct Pinger;
//! #[async_trait]
//! impl Consume<Ping> for Pinger {
//!     async fn consume(&self, _: &Ping, _: CancellationToken) -> Result<(), ConsumeError> { Ok(()) }
//! }
//! impl Consumer for Pinger {
//!     fn handlers(h: &mut Handlers<Self>) { h.on::<Ping>(); }
//! }
//!
//! let mut registry = ConsumerRegistry::new();
//! registry.register::<Pinger>();
//! let resolver = registry.build_resolver(false);
//! assert_eq!(resolver.resolve(&EventType::of::<Ping>()), vec![ConsumerType::of::<Pinger>()]);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::consumers::{Consumer, ConsumerType, Handlers};
use crate::events::EventType;
use crate::registry::entry::ConsumerEntry;
use crate::registry::resolver::{Catalog, ConsumerTypeResolver, MatchMode};

/// Mapping of consumer types to the event types they handle.
#[derive(Default)]
pub struct ConsumerRegistry {
    entries: Vec<Arc<ConsumerEntry>>,
    index: HashMap<ConsumerType, usize>,
}

impl ConsumerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records every event type `C` declares.
    pub fn register<C: Consumer>(&mut self) -> &mut Self {
        let handlers = Handlers::<C>::collect();
        if handlers.is_empty() {
            return self;
        }

        let ty = ConsumerType::of::<C>();
        let idx = match self.index.get(&ty) {
            Some(idx) => *idx,
            None => {
                self.entries.push(Arc::new(ConsumerEntry::new(ty)));
                self.index.insert(ty, self.entries.len() - 1);
                self.entries.len() - 1
            }
        };

        let entry = &self.entries[idx];
        for (event, binder) in handlers.into_entries() {
            entry.declare(event, binder);
        }
        self
    }

    /// Freezes the registered types into a resolver.
    ///
    /// `use_polymorphism` selects [`MatchMode::Polymorphic`] over [`MatchMode::Exact`].
    pub fn build_resolver(&self, use_polymorphism: bool) -> ConsumerTypeResolver {
        let catalog = Catalog {
            entries: self.entries.clone(),
            index: self.index.clone(),
        };
        ConsumerTypeResolver::new(catalog, MatchMode::from_polymorphism(use_polymorphism))
    }

    /// Number of registered consumer types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no consumer type is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if `ty` is registered.
    pub fn contains(&self, ty: ConsumerType) -> bool {
        self.index.contains_key(&ty)
    }

    /// Registered consumer types, in registration order.
    pub fn consumer_types(&self) -> Vec<ConsumerType> {
        self.entries.iter().map(|e| e.consumer_type()).collect()
    }

    /// Event types recorded for `ty` (declared plus memoized), unordered.
    pub fn declared_events(&self, ty: ConsumerType) -> Vec<EventType> {
        self.index
            .get(&ty)
            .map(|idx| self.entries[*idx].matched_events())
            .unwrap_or_default()
    }
}
