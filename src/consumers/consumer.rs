//! # Consumer capability list and type identity.
//!
//! [`Consumer`] is how a type tells the registry which events it handles. It is
//! called once per registration, never on the dispatch path:
//!
//! ```text
//! ConsumerRegistry::register::<Mailer>()
//!     └─► Mailer::handlers(&mut Handlers<Mailer>)
//!            ├─ .on::<OrderPlaced>()   (requires Mailer: Consume<OrderPlaced>)
//!            └─ .on::<UserSignedUp>()  (requires Mailer: Consume<UserSignedUp>)
//! ```
//!
//! Each `on::<E>()` stores a type-erased binder that later turns a live instance and
//! an [`AnyEvent`] into a boxed handler future.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::consumers::Consume;
use crate::error::ConsumeError;
use crate::events::{short_name, AnyEvent, Event, EventType};
use crate::provider::Instance;

/// Boxed handler invocation, ready to be awaited or spawned.
pub type ConsumeFuture = BoxFuture<'static, Result<(), ConsumeError>>;

/// Type-erased handler: downcasts the instance and the event, then calls `consume`.
///
/// Returns `None` when either downcast fails.
pub(crate) type Binder =
    Arc<dyn Fn(&Instance, &AnyEvent, CancellationToken) -> Option<ConsumeFuture> + Send + Sync>;

/// # A type that handles one or more event types.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use polybus::{Consume, ConsumeError, Consumer, Event, Handlers};
///
/// struct OrderPlaced;
/// impl Event for OrderPlaced {}
///
/// struct Mailer;
///
/// #[async_trait]
/// impl Consume<OrderPlaced> for Mailer {
///     async fn consume(&self, _e: &OrderPlaced, _ctx: CancellationToken) -> Result<(), ConsumeError> {
///         Ok(())
///     }
/// }
///
/// impl Consumer for Mailer {
///     fn handlers(h: &mut Handlers<Self>) {
///         h.on::<OrderPlaced>();
///     }
/// }
/// ```
pub trait Consumer: Send + Sync + 'static {
    /// Declares every event type this consumer handles.
    ///
    /// Declaring nothing is legal; registration is then a no-op.
    fn handlers(h: &mut Handlers<Self>)
    where
        Self: Sized;
}

/// Capability list collected from [`Consumer::handlers`].
pub struct Handlers<C> {
    entries: Vec<(EventType, Binder)>,
    _consumer: PhantomData<fn() -> C>,
}

impl<C: Consumer> Handlers<C> {
    pub(crate) fn collect() -> Self {
        let mut h = Self {
            entries: Vec::new(),
            _consumer: PhantomData,
        };
        C::handlers(&mut h);
        h
    }

    /// Declares that `C` handles `E`.
    pub fn on<E: Event>(&mut self) -> &mut Self
    where
        C: Consume<E>,
    {
        self.entries.push((EventType::of::<E>(), bind::<C, E>()));
        self
    }

    /// Number of declared handlers (duplicates included).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<(EventType, Binder)> {
        self.entries
    }
}

fn bind<C, E>() -> Binder
where
    C: Consume<E>,
    E: Event,
{
    Arc::new(|instance: &Instance, event: &AnyEvent, ctx: CancellationToken| {
        let consumer = Arc::clone(instance).downcast::<C>().ok()?;
        let event = event.downcast::<E>()?;
        let fut: ConsumeFuture =
            Box::pin(async move { <C as Consume<E>>::consume(&consumer, &event, ctx).await });
        Some(fut)
    })
}

/// Stable identifier of a consumer type.
///
/// Equality and hashing use the `TypeId` only; the name is used in logs and signals.
#[derive(Clone, Copy)]
pub struct ConsumerType {
    id: TypeId,
    name: &'static str,
}

impl ConsumerType {
    /// Returns the identifier of `C`.
    pub fn of<C: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<C>(),
            name: short_name(std::any::type_name::<C>()),
        }
    }

    /// Rust `TypeId` of the consumer type.
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Short type name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ConsumerType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConsumerType {}

impl Hash for ConsumerType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ConsumerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ConsumerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
