//! # Consumer type resolution.
//!
//! [`ConsumerTypeResolver`] answers "which consumer types apply to this event type".
//!
//! - [`MatchMode::Exact`]: a consumer applies when it declared the event type itself.
//! - [`MatchMode::Polymorphic`]: a consumer also applies when one of its declared event
//!   types is a supertype or a subtype of the event type. The hit is memoized into the
//!   consumer's entry, so later lookups of the same type are plain set hits for every
//!   resolver built from the same registry, exact ones included.
//!
//! ```text
//! resolve(Leaf)
//!   for entry in registration order:
//!       matched ∋ Leaf ?                          ──► yes: include
//!       Polymorphic && any declared ~ Leaf ?      ──► yes: matched += Leaf, include
//! ```
//!
//! Results come back in registration order, each consumer type at most once.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::consumers::{ConsumeFuture, ConsumerType};
use crate::events::{AnyEvent, Event, EventType};
use crate::provider::Instance;
use crate::registry::entry::ConsumerEntry;

/// Event type matching semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Identity of event types only.
    #[default]
    Exact,
    /// Identity or assignability in either direction.
    Polymorphic,
}

impl MatchMode {
    /// Picks the mode from the `use_event_polymorphism` flag.
    pub fn from_polymorphism(enabled: bool) -> Self {
        if enabled {
            MatchMode::Polymorphic
        } else {
            MatchMode::Exact
        }
    }
}

/// Frozen list of entries at resolver build time.
pub(crate) struct Catalog {
    pub(crate) entries: Vec<Arc<ConsumerEntry>>,
    pub(crate) index: HashMap<ConsumerType, usize>,
}

/// Maps event types to the consumer types that handle them.
///
/// Cheap to clone; clones share the same catalog.
#[derive(Clone)]
pub struct ConsumerTypeResolver {
    catalog: Arc<Catalog>,
    mode: MatchMode,
}

impl ConsumerTypeResolver {
    pub(crate) fn new(catalog: Catalog, mode: MatchMode) -> Self {
        Self {
            catalog: Arc::new(catalog),
            mode,
        }
    }

    /// Matching semantics of this resolver.
    #[inline]
    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Returns the consumer types applicable to `event`, in registration order.
    ///
    /// Recomputed on every call from the current entry state.
    pub fn resolve(&self, event: &EventType) -> Vec<ConsumerType> {
        self.catalog
            .entries
            .iter()
            .filter(|entry| match self.mode {
                MatchMode::Exact => entry.matches_exact(event),
                MatchMode::Polymorphic => entry.matches_related(event),
            })
            .map(|entry| entry.consumer_type())
            .collect()
    }

    /// [`resolve`](Self::resolve) for a statically known event type.
    pub fn resolve_for<E: Event>(&self) -> Vec<ConsumerType> {
        self.resolve(&EventType::of::<E>())
    }

    /// Builds the call of `consumer`'s handler for `event` on `instance`.
    ///
    /// `None` when the consumer is unknown or has no handler usable for the event.
    pub fn bind(
        &self,
        consumer: ConsumerType,
        instance: &Instance,
        event: &AnyEvent,
        ctx: CancellationToken,
    ) -> Option<ConsumeFuture> {
        let idx = *self.catalog.index.get(&consumer)?;
        self.catalog.entries.get(idx)?.bind(instance, event, ctx)
    }

    /// Consumer types known to this resolver, in registration order.
    pub fn consumer_types(&self) -> Vec<ConsumerType> {
        self.catalog
            .entries
            .iter()
            .map(|entry| entry.consumer_type())
            .collect()
    }
}

impl std::fmt::Debug for ConsumerTypeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerTypeResolver")
            .field("mode", &self.mode)
            .field("consumers", &self.consumer_types())
            .finish()
    }
}
