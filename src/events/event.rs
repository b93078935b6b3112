//! # Event values and their routing identity.
//!
//! Any `Send + Sync + 'static` value can travel through the bus once it implements
//! [`Event`]. Routing never inspects the value itself: it keys on [`EventType`], a
//! stable identifier made of the Rust `TypeId`, the type name (used as the metrics
//! tag) and the list of [`Supertype`]s the event declares.
//!
//! ## Supertypes
//! Polymorphic routing needs to know which types an event "is". Rust has no runtime
//! inheritance, so an event spells it out: each [`Supertype`] names a base view type
//! and a projection that builds the view from the concrete event. An interface-like
//! base is simply a view type wrapping a trait object.
//!
//! ```text
//!   Circle ──(project)──► Shape(Arc<dyn Area>) ──(project)──► Drawable
//!     ▲                         ▲
//!     │ exact                   │ assignable from Circle
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use polybus::{Event, EventType, Supertype};
//!
//! trait Area: Send + Sync { fn area(&self) -> f64; }
//!
//! struct Circle { r: f64 }
//! impl Area for Circle { fn area(&self) -> f64 { 3.0 * self.r * self.r } }
//!
//! struct Shape(Arc<dyn Area>);
//! impl Event for Shape {}
//!
//! impl Event for Circle {
//!     fn supertypes() -> Vec<Supertype> {
//!         vec![Supertype::new::<Circle, Shape>(|c| Shape(c))]
//!     }
//! }
//!
//! let shape = EventType::of::<Shape>();
//! let circle = EventType::of::<Circle>();
//! assert!(shape.is_assignable_from(&circle));
//! assert!(!circle.is_assignable_from(&shape));
//! assert!(circle.is_related_to(&shape));
//! ```

use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// # Marker for values that can be dispatched.
///
/// Implementing it is usually a one-liner (`impl Event for Ping {}`); override
/// [`supertypes`](Event::supertypes) to take part in polymorphic routing.
pub trait Event: Send + Sync + 'static {
    /// Types this event can be viewed as, nearest first.
    ///
    /// Only consulted when polymorphic matching is enabled or when a consumer
    /// declared a base type rather than the concrete one.
    fn supertypes() -> Vec<Supertype>
    where
        Self: Sized,
    {
        Vec::new()
    }
}

/// Stable identifier of an event type.
///
/// Equality and hashing use the `TypeId` only; the name is a display/metrics tag.
#[derive(Clone, Copy)]
pub struct EventType {
    id: TypeId,
    name: &'static str,
    supertypes: fn() -> Vec<Supertype>,
}

impl EventType {
    /// Returns the identifier of `E`.
    pub fn of<E: Event>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: short_name(std::any::type_name::<E>()),
            supertypes: E::supertypes,
        }
    }

    /// Rust `TypeId` of the event type.
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Short type name (path stripped), used as the metrics tag.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared direct supertypes.
    pub fn supertypes(&self) -> Vec<Supertype> {
        (self.supertypes)()
    }

    /// True when a value of `other` can be viewed as `self`: `other` is `self`,
    /// or reaches `self` through its supertypes (transitively).
    pub fn is_assignable_from(&self, other: &EventType) -> bool {
        if self == other {
            return true;
        }
        let mut seen: HashSet<TypeId> = HashSet::new();
        let mut stack = vec![*other];
        while let Some(current) = stack.pop() {
            if !seen.insert(current.id) {
                continue;
            }
            for sup in current.supertypes() {
                if sup.event_type() == *self {
                    return true;
                }
                stack.push(sup.event_type());
            }
        }
        false
    }

    /// Bidirectional assignability check used by polymorphic resolution.
    #[inline]
    pub fn is_related_to(&self, other: &EventType) -> bool {
        self.is_assignable_from(other) || other.is_assignable_from(self)
    }
}

impl PartialEq for EventType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventType {}

impl Hash for EventType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

type Projection = dyn Fn(&AnyEvent) -> Option<AnyEvent> + Send + Sync;

/// A base type an event can be viewed as, with the projection building the view.
#[derive(Clone)]
pub struct Supertype {
    ty: EventType,
    project: Arc<Projection>,
}

impl Supertype {
    /// Declares `B` as a supertype of `E`, viewed through `project`.
    pub fn new<E: Event, B: Event>(project: fn(Arc<E>) -> B) -> Self {
        Self {
            ty: EventType::of::<B>(),
            project: Arc::new(move |event: &AnyEvent| {
                event.downcast::<E>().map(|e| AnyEvent::new(project(e)))
            }),
        }
    }

    /// The base type.
    #[inline]
    pub fn event_type(&self) -> EventType {
        self.ty
    }

    /// Builds the base view of `event`; `None` when `event` is not the declaring type.
    pub fn project(&self, event: &AnyEvent) -> Option<AnyEvent> {
        (self.project)(event)
    }
}

impl fmt::Debug for Supertype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Supertype").field(&self.ty).finish()
    }
}

/// Type-erased event value tagged with its [`EventType`].
///
/// Cheap to clone (the payload sits behind an `Arc`). This is what the events
/// queue stores and what failed-event records hand back.
#[derive(Clone)]
pub struct AnyEvent {
    ty: EventType,
    data: Arc<dyn Any + Send + Sync>,
}

impl AnyEvent {
    /// Wraps an event value.
    pub fn new<E: Event>(event: E) -> Self {
        Self::from_arc(Arc::new(event))
    }

    /// Wraps an already shared event value.
    pub fn from_arc<E: Event>(event: Arc<E>) -> Self {
        Self {
            ty: EventType::of::<E>(),
            data: event,
        }
    }

    /// Runtime type of the wrapped value.
    #[inline]
    pub fn event_type(&self) -> EventType {
        self.ty
    }

    /// Short type name of the wrapped value.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.ty.name()
    }

    /// True if the wrapped value is an `E`.
    #[inline]
    pub fn is<E: Event>(&self) -> bool {
        self.ty.id() == TypeId::of::<E>()
    }

    /// Borrows the wrapped value as `E`.
    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        self.data.downcast_ref::<E>()
    }

    /// Shares the wrapped value as `Arc<E>`.
    pub fn downcast<E: Event>(&self) -> Option<Arc<E>> {
        Arc::clone(&self.data).downcast::<E>().ok()
    }

    /// True if both handles point at the same value.
    pub fn ptr_eq(&self, other: &AnyEvent) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for AnyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyEvent").field("type", &self.ty).finish()
    }
}

/// Strips the module path of the outer type; generic arguments are left as is.
pub(crate) fn short_name(full: &'static str) -> &'static str {
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping;
    impl Event for Ping {}

    struct Base(u32);
    impl Event for Base {}

    struct Middle(u32);
    impl Event for Middle {
        fn supertypes() -> Vec<Supertype> {
            vec![Supertype::new::<Middle, Base>(|m| Base(m.0))]
        }
    }

    struct Leaf(u32);
    impl Event for Leaf {
        fn supertypes() -> Vec<Supertype> {
            vec![Supertype::new::<Leaf, Middle>(|l| Middle(l.0 + 1))]
        }
    }

    // Two types declaring each other must not loop.
    struct Yin;
    struct Yang;
    impl Event for Yin {
        fn supertypes() -> Vec<Supertype> {
            vec![Supertype::new::<Yin, Yang>(|_| Yang)]
        }
    }
    impl Event for Yang {
        fn supertypes() -> Vec<Supertype> {
            vec![Supertype::new::<Yang, Yin>(|_| Yin)]
        }
    }

    #[test]
    fn test_identity_uses_type_id() {
        assert_eq!(EventType::of::<Ping>(), EventType::of::<Ping>());
        assert_ne!(EventType::of::<Ping>(), EventType::of::<Base>());
        assert_eq!(EventType::of::<Ping>().name(), "Ping");
    }

    #[test]
    fn test_assignability_is_transitive_and_directed() {
        let base = EventType::of::<Base>();
        let leaf = EventType::of::<Leaf>();
        assert!(base.is_assignable_from(&leaf));
        assert!(!leaf.is_assignable_from(&base));
        assert!(leaf.is_related_to(&base));
        assert!(base.is_related_to(&leaf));
        assert!(!EventType::of::<Ping>().is_related_to(&base));
    }

    #[test]
    fn test_cyclic_declarations_terminate() {
        let yin = EventType::of::<Yin>();
        let yang = EventType::of::<Yang>();
        assert!(yin.is_assignable_from(&yang));
        assert!(!EventType::of::<Ping>().is_assignable_from(&yin));
    }

    #[test]
    fn test_projection_builds_base_view() {
        let leaf = AnyEvent::new(Leaf(1));
        let middle = EventType::of::<Leaf>().supertypes()[0]
            .project(&leaf)
            .expect("leaf projects to middle");
        assert!(middle.is::<Middle>());
        assert_eq!(middle.downcast_ref::<Middle>().map(|m| m.0), Some(2));

        let wrong = AnyEvent::new(Ping);
        assert!(EventType::of::<Leaf>().supertypes()[0].project(&wrong).is_none());
    }

    #[test]
    fn test_any_event_round_trips_payload() {
        let ev = AnyEvent::new(Base(7));
        assert!(ev.is::<Base>());
        assert!(!ev.is::<Ping>());
        assert_eq!(ev.downcast_ref::<Base>().map(|b| b.0), Some(7));
        assert!(ev.downcast::<Ping>().is_none());
        assert!(ev.ptr_eq(&ev.clone()));
    }

    #[test]
    fn test_short_name_strips_paths() {
        assert_eq!(short_name("a::b::Ping"), "Ping");
        assert_eq!(short_name("Ping"), "Ping");
        assert_eq!(short_name("a::Wrapper<b::Ping>"), "Wrapper<b::Ping>");
    }
}
