//! # Minimal consumer container with lifetimes.
//!
//! [`Container`] is the built-in [`ConsumerProvider`]: consumers are registered with
//! a [`Lifetime`], and resolution follows it.
//!
//! | Lifetime    | Root provider            | Scope from `create_scope()` |
//! |-------------|--------------------------|-----------------------------|
//! | `Singleton` | the registered instance  | the same instance           |
//! | `Scoped`    | one instance, cached     | one instance per scope      |
//! | `Transient` | fresh on every call      | fresh on every call         |
//!
//! Registering the same consumer type twice with one lifetime adds a second
//! instance/factory (both are returned). Mixing lifetimes for one type is rejected
//! with [`ContainerError::LifetimeMismatch`].
//!
//! ## Example
//! ```
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use polybus::{Consume, ConsumeError, Consumer, ConsumerProvider, ConsumerType, Container, Event, Handlers};
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
//! let mut container = Container::new();
//! container.add_transient(|| Pinger).unwrap();
//! assert!(container.add_singleton(Pinger).is_err());
//! assert_eq!(container.get_consumers(ConsumerType::of::<Pinger>()).unwrap().len(), 1);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::consumers::{Consumer, ConsumerType};
use crate::error::{ContainerError, ProviderError};
use crate::provider::{ConsumerProvider, Instance, ScopeFactory};

/// How long a resolved consumer instance lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// One instance for the whole container.
    Singleton,
    /// One instance per resolution scope.
    Scoped,
    /// A new instance on every resolution.
    Transient,
}

type Factory = Arc<dyn Fn() -> Instance + Send + Sync>;

enum Source {
    Shared(Instance),
    Factory(Factory),
}

struct Slot {
    lifetime: Lifetime,
    sources: Vec<Source>,
}

type ScopeCache = Mutex<HashMap<ConsumerType, Vec<Instance>>>;

struct Inner {
    slots: RwLock<HashMap<ConsumerType, Slot>>,
    root_scope: ScopeCache,
}

/// Consumer registrations keyed by consumer type.
///
/// Cheap to clone; clones share registrations.
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: RwLock::new(HashMap::new()),
                root_scope: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Registers a shared instance of `C`.
    pub fn add_singleton<C: Consumer>(&mut self, consumer: C) -> Result<&mut Self, ContainerError> {
        self.add::<C>(Lifetime::Singleton, Source::Shared(Arc::new(consumer)))?;
        Ok(self)
    }

    /// Registers a factory for `C`, invoked once per resolution scope.
    pub fn add_scoped<C, F>(&mut self, factory: F) -> Result<&mut Self, ContainerError>
    where
        C: Consumer,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.add::<C>(Lifetime::Scoped, Source::Factory(erase(factory)))?;
        Ok(self)
    }

    /// Registers a factory for `C`, invoked on every resolution.
    pub fn add_transient<C, F>(&mut self, factory: F) -> Result<&mut Self, ContainerError>
    where
        C: Consumer,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.add::<C>(Lifetime::Transient, Source::Factory(erase(factory)))?;
        Ok(self)
    }

    /// True if `ty` has at least one registration.
    pub fn contains(&self, ty: ConsumerType) -> bool {
        self.inner.slots.read().contains_key(&ty)
    }

    /// Lifetime `ty` is registered with, if any.
    pub fn lifetime(&self, ty: ConsumerType) -> Option<Lifetime> {
        self.inner.slots.read().get(&ty).map(|slot| slot.lifetime)
    }

    fn add<C: Consumer>(&mut self, lifetime: Lifetime, source: Source) -> Result<(), ContainerError> {
        let ty = ConsumerType::of::<C>();
        let mut slots = self.inner.slots.write();
        let slot = slots.entry(ty).or_insert_with(|| Slot {
            lifetime,
            sources: Vec::new(),
        });
        if slot.lifetime != lifetime {
            return Err(ContainerError::LifetimeMismatch {
                consumer: ty.name(),
                registered: slot.lifetime,
                requested: lifetime,
            });
        }
        slot.sources.push(source);
        Ok(())
    }

    fn resolve(&self, ty: ConsumerType, scope: &ScopeCache) -> Vec<Instance> {
        let slots = self.inner.slots.read();
        let Some(slot) = slots.get(&ty) else {
            return Vec::new();
        };
        match slot.lifetime {
            Lifetime::Singleton | Lifetime::Transient => {
                slot.sources.iter().map(Source::instance).collect()
            }
            Lifetime::Scoped => scope
                .lock()
                .entry(ty)
                .or_insert_with(|| slot.sources.iter().map(Source::instance).collect())
                .clone(),
        }
    }
}

impl Source {
    fn instance(&self) -> Instance {
        match self {
            Source::Shared(instance) => Arc::clone(instance),
            Source::Factory(factory) => factory(),
        }
    }
}

fn erase<C, F>(factory: F) -> Factory
where
    C: Consumer,
    F: Fn() -> C + Send + Sync + 'static,
{
    Arc::new(move || -> Instance { Arc::new(factory()) })
}

impl ConsumerProvider for Container {
    fn get_consumers(&self, ty: ConsumerType) -> Result<Vec<Instance>, ProviderError> {
        Ok(self.resolve(ty, &self.inner.root_scope))
    }
}

impl ScopeFactory for Container {
    fn create_scope(&self) -> Result<Arc<dyn ConsumerProvider>, ProviderError> {
        Ok(Arc::new(Scope {
            container: self.clone(),
            cache: Mutex::new(HashMap::new()),
        }))
    }
}

/// Resolution scope handed out by [`Container::create_scope`].
struct Scope {
    container: Container,
    cache: ScopeCache,
}

impl ConsumerProvider for Scope {
    fn get_consumers(&self, ty: ConsumerType) -> Result<Vec<Instance>, ProviderError> {
        Ok(self.container.resolve(ty, &self.cache))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumers::Handlers;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static BUILT: AtomicUsize = AtomicUsize::new(0);

    struct Counted;
    impl Consumer for Counted {
        fn handlers(_h: &mut Handlers<Self>) {}
    }

    struct Plain;
    impl Consumer for Plain {
        fn handlers(_h: &mut Handlers<Self>) {}
    }

    struct PerScope;
    impl Consumer for PerScope {
        fn handlers(_h: &mut Handlers<Self>) {}
    }

    fn one(provider: &dyn ConsumerProvider, ty: ConsumerType) -> Instance {
        let mut all = provider.get_consumers(ty).expect("resolve");
        assert_eq!(all.len(), 1);
        all.remove(0)
    }

    #[test]
    fn test_singleton_is_shared_across_scopes() {
        let mut c = Container::new();
        c.add_singleton(Plain).expect("register");
        let ty = ConsumerType::of::<Plain>();

        let root = one(&c, ty);
        let scope = c.create_scope().expect("scope");
        assert!(Arc::ptr_eq(&root, &one(scope.as_ref(), ty)));
        assert_eq!(c.lifetime(ty), Some(Lifetime::Singleton));
    }

    #[test]
    fn test_scoped_is_cached_per_scope() {
        let mut c = Container::new();
        c.add_scoped(|| PerScope).expect("register");
        let ty = ConsumerType::of::<PerScope>();

        let s1 = c.create_scope().expect("scope");
        let s2 = c.create_scope().expect("scope");
        let a = one(s1.as_ref(), ty);
        assert!(Arc::ptr_eq(&a, &one(s1.as_ref(), ty)));
        assert!(!Arc::ptr_eq(&a, &one(s2.as_ref(), ty)));
    }

    #[test]
    fn test_transient_builds_every_time() {
        let mut c = Container::new();
        c.add_transient(|| {
            BUILT.fetch_add(1, Ordering::SeqCst);
            Counted
        })
        .expect("register");
        let ty = ConsumerType::of::<Counted>();

        let before = BUILT.load(Ordering::SeqCst);
        let _ = one(&c, ty);
        let _ = one(&c, ty);
        assert_eq!(BUILT.load(Ordering::SeqCst) - before, 2);
    }

    #[test]
    fn test_mixed_lifetimes_are_rejected() {
        let mut c = Container::new();
        c.add_transient(|| Plain).expect("register");
        let err = c.add_singleton(Plain).err().expect("mismatch");
        assert_eq!(
            err,
            ContainerError::LifetimeMismatch {
                consumer: "Plain",
                registered: Lifetime::Transient,
                requested: Lifetime::Singleton,
            }
        );

        c.add_transient(|| Plain).expect("same lifetime adds");
        assert_eq!(c.get_consumers(ConsumerType::of::<Plain>()).expect("resolve").len(), 2);
    }

    #[test]
    fn test_unregistered_type_resolves_to_nothing() {
        let c = Container::new();
        assert!(!c.contains(ConsumerType::of::<Plain>()));
        assert!(c.get_consumers(ConsumerType::of::<Plain>()).expect("resolve").is_empty());
    }
}
