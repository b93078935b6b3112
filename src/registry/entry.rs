//! Per-consumer record shared by the registry and every resolver built from it.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::consumers::{Binder, ConsumeFuture, ConsumerType};
use crate::events::{AnyEvent, EventType};
use crate::provider::Instance;

/// Declared handlers of one consumer type plus the event types matched so far.
///
/// `matched` only grows: it starts as the declared event types and polymorphic
/// resolution adds every concrete type it finds related. Concurrent inserts of the
/// same type are harmless.
pub(crate) struct ConsumerEntry {
    ty: ConsumerType,
    handlers: RwLock<HashMap<EventType, Binder>>,
    matched: RwLock<HashSet<EventType>>,
}

impl ConsumerEntry {
    pub(crate) fn new(ty: ConsumerType) -> Self {
        Self {
            ty,
            handlers: RwLock::new(HashMap::new()),
            matched: RwLock::new(HashSet::new()),
        }
    }

    #[inline]
    pub(crate) fn consumer_type(&self) -> ConsumerType {
        self.ty
    }

    /// Adds a handler; an existing handler for the same event type is kept.
    pub(crate) fn declare(&self, event: EventType, binder: Binder) {
        self.handlers.write().entry(event).or_insert(binder);
        self.matched.write().insert(event);
    }

    pub(crate) fn matched_events(&self) -> Vec<EventType> {
        self.matched.read().iter().copied().collect()
    }

    /// Exact membership, including memoized polymorphic matches.
    pub(crate) fn matches_exact(&self, event: &EventType) -> bool {
        self.matched.read().contains(event)
    }

    /// Exact membership, else a related declared type; a related hit is memoized.
    pub(crate) fn matches_related(&self, event: &EventType) -> bool {
        if self.matches_exact(event) {
            return true;
        }
        let related = self
            .handlers
            .read()
            .keys()
            .any(|declared| declared.is_related_to(event));
        if related {
            self.matched.write().insert(*event);
        }
        related
    }

    /// Builds the handler call for `event`.
    ///
    /// Uses the handler of the event's own type first, then walks up the declared
    /// supertypes, projecting the event at each step. `None` means this consumer has
    /// no handler usable for the event (or `instance` is not of this consumer type).
    pub(crate) fn bind(
        &self,
        instance: &Instance,
        event: &AnyEvent,
        ctx: CancellationToken,
    ) -> Option<ConsumeFuture> {
        let handlers = self.handlers.read();
        let mut seen: HashSet<EventType> = HashSet::new();
        let mut pending = vec![event.clone()];

        while let Some(current) = pending.pop() {
            let ty = current.event_type();
            if !seen.insert(ty) {
                continue;
            }
            if let Some(binder) = handlers.get(&ty) {
                return binder(instance, &current, ctx);
            }
            // Reversed so the nearest declared supertype is tried first.
            for sup in ty.supertypes().iter().rev() {
                if let Some(view) = sup.project(&current) {
                    pending.push(view);
                }
            }
        }
        None
    }
}
