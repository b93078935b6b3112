use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::consumers::Consumer;
use crate::core::{Config, EventBus};
use crate::error::BuildError;
use crate::provider::{ConsumerProvider, Container, ScopeFactory};
use crate::registry::ConsumerRegistry;
use crate::signals::SignalBus;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for constructing an [`EventBus`].
///
/// Consumers are registered here; instances come from the provider passed to
/// [`build`](EventBusBuilder::build) or
/// [`build_with_container`](EventBusBuilder::build_with_container).
pub struct EventBusBuilder {
    cfg: Config,
    registry: ConsumerRegistry,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl EventBusBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            registry: ConsumerRegistry::new(),
            subscribers: Vec::new(),
        }
    }

    /// Registers consumer type `C`.
    pub fn add_consumer<C: Consumer>(mut self) -> Self {
        self.registry.register::<C>();
        self
    }

    /// Replaces the registry with one filled elsewhere.
    pub fn with_registry(mut self, registry: ConsumerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Sets signal subscribers for observability.
    ///
    /// Subscribers receive dispatch signals through dedicated workers with
    /// bounded queues. With subscribers, `build` must run inside a Tokio runtime.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// The consumers registered so far.
    pub fn registry(&self) -> &ConsumerRegistry {
        &self.registry
    }

    /// Builds the bus on top of any provider.
    pub fn build<P>(self, provider: Arc<P>) -> Arc<EventBus>
    where
        P: ConsumerProvider + ScopeFactory,
    {
        let resolver = self.registry.build_resolver(self.cfg.use_event_polymorphism);
        let signals = SignalBus::new(self.cfg.signal_capacity_clamped());
        let has_subscribers = !self.subscribers.is_empty();
        let subs = Arc::new(SubscriberSet::new(self.subscribers, signals.clone()));
        let runtime_token = CancellationToken::new();

        if has_subscribers {
            signal_listener(&signals, Arc::clone(&subs), runtime_token.clone());
        }

        tracing::debug!(
            consumers = self.registry.len(),
            polymorphic = self.cfg.use_event_polymorphism,
            "event bus built"
        );

        Arc::new(EventBus::new_internal(
            self.cfg,
            resolver,
            Arc::clone(&provider) as Arc<dyn ConsumerProvider>,
            provider as Arc<dyn ScopeFactory>,
            signals,
            subs,
            runtime_token,
        ))
    }

    /// Builds the bus on top of a [`Container`].
    ///
    /// Fails with [`BuildError::ConsumerNotProvided`] if a registered consumer type has
    /// no registration in `container`.
    pub fn build_with_container(self, container: Container) -> Result<Arc<EventBus>, BuildError> {
        if let Some(missing) = self
            .registry
            .consumer_types()
            .into_iter()
            .find(|ty| !container.contains(*ty))
        {
            return Err(BuildError::ConsumerNotProvided {
                consumer: missing.name(),
            });
        }
        Ok(self.build(Arc::new(container)))
    }
}

/// Forwards signals from the bus to the subscriber set until `stop` fires.
fn signal_listener(signals: &SignalBus, subs: Arc<SubscriberSet>, stop: CancellationToken) {
    let mut rx = signals.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(sig) => subs.emit(&sig),
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "signal listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
    });
}
