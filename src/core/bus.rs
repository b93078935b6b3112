//! # EventBus: the dispatch façade.
//!
//! [`EventBus`] exposes the two delivery paths:
//!
//! - [`send`](EventBus::send) resolves consumers and runs their handlers now, in the
//!   caller's task. Handler errors come back to the caller.
//! - [`publish`](EventBus::publish) appends the event to the [`EventQueue`] and returns.
//!   The [`QueueProcessor`](crate::QueueProcessor) started by
//!   [`spawn_processor`](EventBus::spawn_processor) delivers it later.
//!
//! ## Immediate path
//! ```text
//! send(event)
//!   ├─► signal EventSent
//!   ├─► resolver.resolve(type) ── empty ──► Ok(())   (provider never asked)
//!   ├─► provider.get_consumers(ty) for each type
//!   ├─► resolver.bind(ty, instance, event) ── None ──► log + ConsumerMissing, skip
//!   └─► fan-out
//!         one call     → awaited directly
//!         Sequential   → awaited in order, first error returned
//!         Parallel     → join_all, every error returned together
//! ```
//!
//! ## Example
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use polybus::{Config, Consume, ConsumeError, Consumer, Container, Event, EventBusBuilder, Handlers};
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
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut container = Container::new();
//! container.add_singleton(Pinger)?;
//!
//! let bus = EventBusBuilder::new(Config::default())
//!     .add_consumer::<Pinger>()
//!     .build_with_container(container)?;
//!
//! let ctx = CancellationToken::new();
//! bus.send(Ping, &ctx).await?;
//! bus.publish(Ping, &ctx).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::consumers::{ConsumeFuture, ConsumerType};
use crate::core::processor::{FailureSink, QueueProcessor};
use crate::core::{report, Config};
use crate::error::{BusError, ConsumerFailure};
use crate::events::{AnyEvent, Event};
use crate::policies::ProcessingMode;
use crate::provider::{ConsumerProvider, ScopeFactory};
use crate::queue::{EventQueue, FailedEvent};
use crate::registry::ConsumerTypeResolver;
use crate::signals::{Signal, SignalBus};
use crate::subscribers::SubscriberSet;

/// Handler calls collected for one `send`.
///
/// A single call is kept out of a `Vec`.
enum Fanout {
    Empty,
    One(ConsumerType, ConsumeFuture),
    Many(Vec<(ConsumerType, ConsumeFuture)>),
}

impl Fanout {
    fn push(&mut self, consumer: ConsumerType, call: ConsumeFuture) {
        *self = match std::mem::replace(self, Fanout::Empty) {
            Fanout::Empty => Fanout::One(consumer, call),
            Fanout::One(first, first_call) => {
                Fanout::Many(vec![(first, first_call), (consumer, call)])
            }
            Fanout::Many(mut calls) => {
                calls.push((consumer, call));
                Fanout::Many(calls)
            }
        };
    }

    async fn run(self, mode: ProcessingMode) -> Result<(), BusError> {
        match self {
            Fanout::Empty => Ok(()),
            Fanout::One(consumer, call) => call
                .await
                .map_err(|source| BusError::Consumer { consumer, source }),
            Fanout::Many(calls) => match mode {
                ProcessingMode::Sequential => {
                    for (consumer, call) in calls {
                        call.await
                            .map_err(|source| BusError::Consumer { consumer, source })?;
                    }
                    Ok(())
                }
                ProcessingMode::Parallel => {
                    let (consumers, calls): (Vec<_>, Vec<_>) = calls.into_iter().unzip();
                    let failures: Vec<ConsumerFailure> = consumers
                        .into_iter()
                        .zip(join_all(calls).await)
                        .filter_map(|(consumer, res)| {
                            res.err().map(|error| ConsumerFailure { consumer, error })
                        })
                        .collect();
                    if failures.is_empty() {
                        Ok(())
                    } else {
                        Err(BusError::Consumers(failures))
                    }
                }
            },
        }
    }
}

/// In-process event bus.
pub struct EventBus {
    cfg: Config,
    resolver: ConsumerTypeResolver,
    provider: Arc<dyn ConsumerProvider>,
    scopes: Arc<dyn ScopeFactory>,
    queue: Arc<EventQueue>,
    signals: SignalBus,
    subs: Arc<SubscriberSet>,
    processor_running: Arc<AtomicBool>,
    runtime_token: CancellationToken,
}

impl EventBus {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new_internal(
        cfg: Config,
        resolver: ConsumerTypeResolver,
        provider: Arc<dyn ConsumerProvider>,
        scopes: Arc<dyn ScopeFactory>,
        signals: SignalBus,
        subs: Arc<SubscriberSet>,
        runtime_token: CancellationToken,
    ) -> Self {
        Self {
            cfg,
            resolver,
            provider,
            scopes,
            queue: Arc::new(EventQueue::new()),
            signals,
            subs,
            processor_running: Arc::new(AtomicBool::new(false)),
            runtime_token,
        }
    }

    /// Delivers `event` to its consumers now.
    ///
    /// Completes immediately when no consumer applies. Handler errors are returned:
    /// [`BusError::Consumer`] for a single call or the first sequential failure,
    /// [`BusError::Consumers`] with every failure in parallel mode.
    pub async fn send<E: Event>(&self, event: E, ctx: &CancellationToken) -> Result<(), BusError> {
        self.send_any(AnyEvent::new(event), ctx).await
    }

    /// Type-erased [`send`](EventBus::send).
    pub async fn send_any(&self, event: AnyEvent, ctx: &CancellationToken) -> Result<(), BusError> {
        let span = tracing::info_span!("send", event = event.name());
        self.dispatch(event, ctx.clone()).instrument(span).await
    }

    async fn dispatch(&self, event: AnyEvent, ctx: CancellationToken) -> Result<(), BusError> {
        report::publish_sent(&self.signals, &event);

        let consumers = self.resolver.resolve(&event.event_type());
        if consumers.is_empty() {
            tracing::trace!("no consumer");
            return Ok(());
        }

        let mut fanout = Fanout::Empty;
        for consumer in consumers {
            for instance in self.provider.get_consumers(consumer)? {
                match self.resolver.bind(consumer, &instance, &event, ctx.clone()) {
                    Some(call) => fanout.push(consumer, call),
                    None => report::missing_handler(&self.signals, consumer, &event),
                }
            }
        }
        fanout.run(self.cfg.consumer_execution_mode).await
    }

    /// Appends `event` to the events queue.
    ///
    /// Fails with [`BusError::QueueDisabled`] when `use_events_queue` is off.
    pub async fn publish<E: Event>(&self, event: E, ctx: &CancellationToken) -> Result<(), BusError> {
        self.publish_any(AnyEvent::new(event), ctx).await
    }

    /// Type-erased [`publish`](EventBus::publish).
    pub async fn publish_any(&self, event: AnyEvent, ctx: &CancellationToken) -> Result<(), BusError> {
        if !self.cfg.use_events_queue {
            return Err(BusError::QueueDisabled);
        }
        let span = tracing::info_span!("publish", event = event.name());
        async {
            let signal_event = event.clone();
            self.queue.enqueue(event, ctx).await?;
            report::publish_published(&self.signals, &signal_event);
            Ok::<(), BusError>(())
        }
        .instrument(span)
        .await
    }

    /// Starts the background queue processor.
    ///
    /// Returns `None` when the events queue is disabled or a processor is still
    /// running for this bus. The processor stops when `token` is cancelled or the
    /// bus is dropped; once its task has finished a new one may be started, and it
    /// picks up whatever the previous one left queued.
    pub fn spawn_processor(&self, token: CancellationToken) -> Option<JoinHandle<()>> {
        if !self.cfg.use_events_queue {
            tracing::debug!("events queue disabled, processor not started");
            return None;
        }
        if self.processor_running.swap(true, Ordering::AcqRel) {
            tracing::warn!("queue processor already running");
            return None;
        }
        let running = RunningGuard(Arc::clone(&self.processor_running));

        let stop = self.runtime_token.child_token();
        let processor = QueueProcessor::new(
            self.resolver.clone(),
            Arc::clone(&self.scopes),
            Arc::clone(&self.queue),
            self.cfg.queue_processing_mode,
            Arc::new(Semaphore::new(self.cfg.gate_size())),
            FailureSink::new(
                Arc::clone(&self.queue),
                self.signals.clone(),
                self.cfg.use_error_queue,
            ),
            self.cfg.queue_tick_rate,
            self.cfg.error_tick_rate,
        );
        Some(tokio::spawn(async move {
            let _running = running;
            tokio::select! {
                _ = processor.run(token) => {}
                _ = stop.cancelled() => {}
            }
        }))
    }

    /// Configuration the bus was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Resolver used by both delivery paths.
    pub fn resolver(&self) -> &ConsumerTypeResolver {
        &self.resolver
    }

    /// The events queue.
    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    /// Snapshot of recorded queued failures (empty unless `use_error_queue` is on).
    pub fn failed_events(&self) -> Vec<FailedEvent> {
        self.queue.failures()
    }

    /// New receiver of dispatch signals.
    pub fn subscribe_signals(&self) -> broadcast::Receiver<Signal> {
        self.signals.subscribe()
    }

    /// Number of subscribers fed by this bus.
    pub fn subscriber_count(&self) -> usize {
        self.subs.len()
    }
}

/// Clears the running flag when the processor task ends, however it ends.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        self.runtime_token.cancel();
    }
}
