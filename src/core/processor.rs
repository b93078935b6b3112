//! # QueueProcessor: background delivery of published events.
//!
//! One processor drains one [`EventQueue`]. Handler errors and panics are caught per
//! invocation; only a failure outside of any handler (resolving instances) makes a
//! pass fail, and even then the loop keeps going after `error_tick_rate`.
//!
//! ## State machine
//! ```text
//!          ┌────────────────────── cancelled ──────────────────────┐
//!          ▼                                                        │
//!   ┌── Idle ── wake-up ──► Draining ── nothing taken ──► Idle      │
//!   │                          │                                    │
//!   │                          ├── pass ok ──► sleep(queue_tick) ───┤
//!   │                          └── provider error ──► sleep(error_tick)
//!   └──────────────────────────────────────────────────────────────►┘
//!
//! Draining, per event:
//!   resolve(type) ─► scope.get_consumers(ty) ─► bind
//!     Sequential: await handler, catch error/panic
//!     Parallel:   acquire gate permit ─► spawn handler ─► next (no wait)
//!   signal EventProcessed
//! ```
//!
//! ## Rules
//! - One resolution scope per drain pass, opened before the first event is taken, so
//!   a scope failure leaves the queue untouched.
//! - Cancellation is checked before every event; untaken events stay queued.
//! - Cancellation never counts as a loop failure.
//! - In parallel mode handlers of consecutive events overlap, bounded by the gate.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::consumers::{ConsumeFuture, ConsumerType};
use crate::core::report;
use crate::error::{panic_reason, ConsumeError, ProviderError};
use crate::events::AnyEvent;
use crate::policies::ProcessingMode;
use crate::provider::{ConsumerProvider, ScopeFactory};
use crate::queue::{EventQueue, FailedEvent};
use crate::registry::ConsumerTypeResolver;
use crate::signals::{Signal, SignalBus, SignalKind};

/// Why a drain pass ended early.
enum PassError {
    /// Cancellation observed, or the gate was closed.
    Stopped,
    /// Instances could not be resolved.
    Provider(ProviderError),
}

impl From<ProviderError> for PassError {
    fn from(err: ProviderError) -> Self {
        PassError::Provider(err)
    }
}

/// Where failed queued invocations go: log, signal, and optionally the error queue.
#[derive(Clone)]
pub(crate) struct FailureSink {
    queue: Arc<EventQueue>,
    signals: SignalBus,
    record: bool,
}

impl FailureSink {
    pub(crate) fn new(queue: Arc<EventQueue>, signals: SignalBus, record: bool) -> Self {
        Self {
            queue,
            signals,
            record,
        }
    }

    /// `stopping` is true when the processor's own token has fired; a cancelled
    /// handler is then part of the shutdown and not a failure.
    fn report(&self, consumer: ConsumerType, event: &AnyEvent, err: ConsumeError, stopping: bool) {
        if stopping && matches!(err, ConsumeError::Canceled) {
            tracing::debug!(consumer = consumer.name(), event = event.name(), "queued consumer cancelled on shutdown");
            return;
        }
        report::consumer_failed(&self.signals, consumer, event, &err);
        if self.record {
            self.queue
                .record_failure(FailedEvent::new(event.clone(), err, Some(consumer)));
        }
    }
}

/// Runs a handler call, turning a panic into a [`ConsumeError::Fail`].
async fn guarded(call: ConsumeFuture) -> Result<(), ConsumeError> {
    match std::panic::AssertUnwindSafe(call).catch_unwind().await {
        Ok(res) => res,
        Err(panic) => Err(ConsumeError::fail(format!(
            "handler panicked: {}",
            panic_reason(&*panic)
        ))),
    }
}

/// Background loop delivering queued events.
///
/// Built by [`EventBus::spawn_processor`](crate::EventBus::spawn_processor).
pub struct QueueProcessor {
    resolver: ConsumerTypeResolver,
    scopes: Arc<dyn ScopeFactory>,
    queue: Arc<EventQueue>,
    mode: ProcessingMode,
    gate: Arc<Semaphore>,
    failures: FailureSink,
    tick: Duration,
    error_tick: Duration,
}

impl QueueProcessor {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        resolver: ConsumerTypeResolver,
        scopes: Arc<dyn ScopeFactory>,
        queue: Arc<EventQueue>,
        mode: ProcessingMode,
        gate: Arc<Semaphore>,
        failures: FailureSink,
        tick: Duration,
        error_tick: Duration,
    ) -> Self {
        Self {
            resolver,
            scopes,
            queue,
            mode,
            gate,
            failures,
            tick,
            error_tick,
        }
    }

    fn signals(&self) -> &SignalBus {
        &self.failures.signals
    }

    /// Drains the queue until `token` is cancelled.
    pub async fn run(self, token: CancellationToken) {
        self.signals().publish(Signal::new(SignalKind::ProcessorStarted));
        tracing::debug!(mode = self.mode.as_label(), "queue processor started");

        loop {
            if self.queue.is_empty() {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = self.queue.ready() => {}
                }
            }

            let pause = match self.drain_pass(&token).await {
                Ok(0) => continue,
                Ok(_) => self.tick,
                Err(PassError::Stopped) => break,
                Err(PassError::Provider(err)) => {
                    report::loop_failed(self.signals(), &err);
                    self.error_tick
                }
            };

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        tracing::debug!("queue processor stopped");
        self.signals().publish(Signal::new(SignalKind::ProcessorStopped));
    }

    /// Takes every available event; returns how many were taken.
    async fn drain_pass(&self, token: &CancellationToken) -> Result<usize, PassError> {
        if self.queue.is_empty() {
            return Ok(0);
        }
        let provider = self.scopes.create_scope()?;
        let mut taken = 0;

        while !token.is_cancelled() {
            let Some(event) = self.queue.try_dequeue() else {
                break;
            };
            taken += 1;

            let span = tracing::info_span!("process_event", event = event.name());
            self.process_event(provider.as_ref(), &event, token)
                .instrument(span)
                .await?;
        }

        if token.is_cancelled() {
            return Err(PassError::Stopped);
        }
        Ok(taken)
    }

    async fn process_event(
        &self,
        provider: &dyn ConsumerProvider,
        event: &AnyEvent,
        token: &CancellationToken,
    ) -> Result<(), PassError> {
        for consumer in self.resolver.resolve(&event.event_type()) {
            for instance in provider.get_consumers(consumer)? {
                let Some(call) = self.resolver.bind(consumer, &instance, event, token.clone())
                else {
                    report::missing_handler(self.signals(), consumer, event);
                    continue;
                };

                match self.mode {
                    ProcessingMode::Sequential => {
                        if let Err(err) = guarded(call).await {
                            self.failures
                                .report(consumer, event, err, token.is_cancelled());
                        }
                    }
                    ProcessingMode::Parallel => {
                        let permit = tokio::select! {
                            res = Arc::clone(&self.gate).acquire_owned() => match res {
                                Ok(permit) => permit,
                                Err(_closed) => return Err(PassError::Stopped),
                            },
                            _ = token.cancelled() => return Err(PassError::Stopped),
                        };
                        let failures = self.failures.clone();
                        let event = event.clone();
                        let token = token.clone();
                        tokio::spawn(
                            async move {
                                let _permit = permit;
                                if let Err(err) = guarded(call).await {
                                    failures.report(consumer, &event, err, token.is_cancelled());
                                }
                            }
                            .in_current_span(),
                        );
                    }
                }
            }
        }
        report::publish_processed(self.signals(), event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumers::{Consume, Consumer, Handlers};
    use crate::core::{Config, EventBus, EventBusBuilder};
    use crate::events::{Event, Supertype};
    use crate::provider::{Container, Instance};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[derive(Debug, PartialEq)]
    struct A(u32);
    impl Event for A {}
    struct B;
    impl Event for B {}
    struct C;
    impl Event for C {}

    /// Records which events it saw.
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<&'static str>>,
    }
    macro_rules! record {
        ($ev:ident) => {
            #[async_trait]
            impl Consume<$ev> for Recorder {
                async fn consume(&self, _: &$ev, _: CancellationToken) -> Result<(), ConsumeError> {
                    self.seen.lock().push(stringify!($ev));
                    Ok(())
                }
            }
        };
    }
    record!(A);
    record!(B);
    record!(C);
    impl Consumer for Recorder {
        fn handlers(h: &mut Handlers<Self>) {
            h.on::<A>().on::<B>().on::<C>();
        }
    }

    /// Fails on every `A`.
    struct Broken;
    #[async_trait]
    impl Consume<A> for Broken {
        async fn consume(&self, a: &A, _: CancellationToken) -> Result<(), ConsumeError> {
            Err(ConsumeError::fail(format!("broken {}", a.0)))
        }
    }
    impl Consumer for Broken {
        fn handlers(h: &mut Handlers<Self>) {
            h.on::<A>();
        }
    }

    /// Panics on every `B`.
    struct Panicky;
    #[async_trait]
    impl Consume<B> for Panicky {
        async fn consume(&self, _: &B, _: CancellationToken) -> Result<(), ConsumeError> {
            panic!("exploded");
        }
    }
    impl Consumer for Panicky {
        fn handlers(h: &mut Handlers<Self>) {
            h.on::<B>();
        }
    }

    fn fast(cfg: Config) -> Config {
        Config {
            queue_tick_rate: Duration::from_millis(5),
            error_tick_rate: Duration::from_millis(5),
            ..cfg
        }
    }

    async fn wait_until(mut done: impl FnMut() -> bool) {
        for _ in 0..200 {
            if done() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    async fn publish_abc(bus: &EventBus, ctx: &CancellationToken) {
        bus.publish(A(1), ctx).await.expect("publish A");
        bus.publish(B, ctx).await.expect("publish B");
        bus.publish(C, ctx).await.expect("publish C");
    }

    #[tokio::test]
    async fn test_published_events_are_delivered() {
        let rec = Arc::new(Recorder::default());
        struct Shared(Arc<Recorder>);
        impl ConsumerProvider for Shared {
            fn get_consumers(&self, _: ConsumerType) -> Result<Vec<Instance>, ProviderError> {
                Ok(vec![self.0.clone() as Instance])
            }
        }
        impl ScopeFactory for Shared {
            fn create_scope(&self) -> Result<Arc<dyn ConsumerProvider>, ProviderError> {
                Ok(Arc::new(Shared(self.0.clone())))
            }
        }

        let bus = EventBusBuilder::new(fast(Config::default()))
            .add_consumer::<Recorder>()
            .build(Arc::new(Shared(Arc::clone(&rec))));
        let ctx = CancellationToken::new();
        let handle = bus.spawn_processor(ctx.clone()).expect("processor");

        publish_abc(&bus, &ctx).await;
        wait_until(|| rec.seen.lock().len() == 3).await;
        assert_eq!(*rec.seen.lock(), vec!["A", "B", "C"]);

        ctx.cancel();
        handle.await.expect("processor exits");
    }

    #[tokio::test]
    async fn test_failure_is_isolated_and_recorded() {
        let rec = Arc::new(Recorder::default());
        let mut c = Container::new();
        c.add_singleton(Broken).expect("register");
        c.add_singleton(Panicky).expect("register");
        let bus = EventBusBuilder::new(fast(Config {
            use_error_queue: true,
            ..Config::default()
        }))
        .add_consumer::<Broken>()
        .add_consumer::<Panicky>()
        .add_consumer::<Recorder>()
        .build(Arc::new(WithRecorder {
            container: c,
            rec: Arc::clone(&rec),
        }));
        let ctx = CancellationToken::new();
        let handle = bus.spawn_processor(ctx.clone()).expect("processor");

        publish_abc(&bus, &ctx).await;
        wait_until(|| rec.seen.lock().len() == 3).await;
        bus.publish(A(2), &ctx).await.expect("publish");
        wait_until(|| rec.seen.lock().len() == 4).await;

        let failures = bus.failed_events();
        assert_eq!(failures.len(), 3);
        assert_eq!(failures[0].consumer, Some(ConsumerType::of::<Broken>()));
        assert_eq!(failures[0].event.downcast_ref::<A>(), Some(&A(1)));
        assert_eq!(failures[0].error, ConsumeError::fail("broken 1"));
        assert_eq!(failures[1].consumer, Some(ConsumerType::of::<Panicky>()));
        assert!(failures[1].error.to_string().contains("exploded"));
        assert_eq!(failures[2].event.downcast_ref::<A>(), Some(&A(2)));
        assert!(failures.windows(2).all(|w| w[0].at <= w[1].at));

        ctx.cancel();
        handle.await.expect("processor exits");
    }

    #[tokio::test]
    async fn test_failures_not_recorded_without_error_queue() {
        let rec = Arc::new(Recorder::default());
        let mut c = Container::new();
        c.add_singleton(Broken).expect("register");
        let bus = EventBusBuilder::new(fast(Config::default()))
            .add_consumer::<Broken>()
            .add_consumer::<Recorder>()
            .build(Arc::new(WithRecorder {
                container: c,
                rec: Arc::clone(&rec),
            }));
        let mut rx = bus.subscribe_signals();
        let ctx = CancellationToken::new();
        let handle = bus.spawn_processor(ctx.clone()).expect("processor");

        bus.publish(A(1), &ctx).await.expect("publish");
        wait_until(|| rec.seen.lock().len() == 1).await;

        ctx.cancel();
        handle.await.expect("processor exits");
        assert!(bus.failed_events().is_empty());

        let mut failed = 0;
        while let Ok(sig) = rx.try_recv() {
            if sig.kind == SignalKind::ConsumerFailed {
                failed += 1;
            }
        }
        assert_eq!(failed, 1);
    }

    /// Container for everything but `Recorder`, which is shared.
    struct WithRecorder {
        container: Container,
        rec: Arc<Recorder>,
    }
    impl ConsumerProvider for WithRecorder {
        fn get_consumers(&self, ty: ConsumerType) -> Result<Vec<Instance>, ProviderError> {
            if ty == ConsumerType::of::<Recorder>() {
                return Ok(vec![self.rec.clone() as Instance]);
            }
            self.container.get_consumers(ty)
        }
    }
    impl ScopeFactory for WithRecorder {
        fn create_scope(&self) -> Result<Arc<dyn ConsumerProvider>, ProviderError> {
            Ok(Arc::new(WithRecorder {
                container: self.container.clone(),
                rec: self.rec.clone(),
            }))
        }
    }

    /// Fails the first `fail_first` lookups.
    struct Flaky {
        inner: WithRecorder,
        fail_first: usize,
        calls: AtomicUsize,
    }
    impl ConsumerProvider for Flaky {
        fn get_consumers(&self, ty: ConsumerType) -> Result<Vec<Instance>, ProviderError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.fail_first {
                return Err(ProviderError::Resolve {
                    consumer: ty.name(),
                    reason: "not ready".into(),
                });
            }
            self.inner.get_consumers(ty)
        }
    }

    struct FlakyScopes(Arc<Flaky>);
    impl ConsumerProvider for FlakyScopes {
        fn get_consumers(&self, ty: ConsumerType) -> Result<Vec<Instance>, ProviderError> {
            self.0.get_consumers(ty)
        }
    }
    impl ScopeFactory for FlakyScopes {
        fn create_scope(&self) -> Result<Arc<dyn ConsumerProvider>, ProviderError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_provider_error_is_a_loop_failure_and_loop_survives() {
        let rec = Arc::new(Recorder::default());
        let flaky = Arc::new(Flaky {
            inner: WithRecorder {
                container: Container::new(),
                rec: Arc::clone(&rec),
            },
            fail_first: 1,
            calls: AtomicUsize::new(0),
        });
        let bus = EventBusBuilder::new(fast(Config::default()))
            .add_consumer::<Recorder>()
            .build(Arc::new(FlakyScopes(flaky)));
        let mut rx = bus.subscribe_signals();
        let ctx = CancellationToken::new();
        let handle = bus.spawn_processor(ctx.clone()).expect("processor");

        // A(1) is lost with the failed pass; B stays queued for the next one.
        publish_abc(&bus, &ctx).await;
        wait_until(|| rec.seen.lock().len() >= 2).await;
        assert_eq!(*rec.seen.lock(), vec!["B", "C"]);

        ctx.cancel();
        handle.await.expect("processor exits");

        let mut kinds = Vec::new();
        while let Ok(sig) = rx.try_recv() {
            kinds.push(sig.kind);
        }
        assert_eq!(
            kinds.iter().filter(|k| **k == SignalKind::QueueLoopFailed).count(),
            1
        );
        assert_eq!(kinds.last(), Some(&SignalKind::ProcessorStopped));
    }

    /// Blocks until released, counting how many run at once.
    struct Slow {
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        done: Arc<AtomicUsize>,
    }
    #[async_trait]
    impl Consume<A> for Slow {
        async fn consume(&self, _: &A, _: CancellationToken) -> Result<(), ConsumeError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            self.done.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
    impl Consumer for Slow {
        fn handlers(h: &mut Handlers<Self>) {
            h.on::<A>();
        }
    }

    async fn peak_for(mode: ProcessingMode, limit: usize) -> usize {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));
        let mut c = Container::new();
        {
            let (running, peak, done) = (running.clone(), peak.clone(), done.clone());
            c.add_transient(move || Slow {
                running: running.clone(),
                peak: peak.clone(),
                done: done.clone(),
            })
            .expect("register");
        }
        let bus = EventBusBuilder::new(fast(Config {
            queue_processing_mode: mode,
            concurrent_task_limit: limit,
            ..Config::default()
        }))
        .add_consumer::<Slow>()
        .build_with_container(c)
        .expect("build");

        let ctx = CancellationToken::new();
        for i in 0..6 {
            bus.publish(A(i), &ctx).await.expect("publish");
        }
        let handle = bus.spawn_processor(ctx.clone()).expect("processor");
        let finished = Arc::clone(&done);
        wait_until(move || finished.load(Ordering::SeqCst) == 6).await;
        ctx.cancel();
        handle.await.expect("processor exits");
        peak.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_sequential_queue_runs_one_handler_at_a_time() {
        assert_eq!(peak_for(ProcessingMode::Sequential, 8).await, 1);
    }

    #[tokio::test]
    async fn test_parallel_queue_overlaps_under_the_gate() {
        let peak = peak_for(ProcessingMode::Parallel, 3).await;
        assert!(peak > 1, "handlers should overlap, peak = {peak}");
        assert!(peak <= 3, "gate exceeded, peak = {peak}");
    }

    #[tokio::test]
    async fn test_processor_restarts_after_cancel_and_drains_leftovers() {
        let rec = Arc::new(Recorder::default());
        let bus = EventBusBuilder::new(fast(Config::default()))
            .add_consumer::<Recorder>()
            .build(Arc::new(WithRecorder {
                container: Container::new(),
                rec: Arc::clone(&rec),
            }));

        let first = CancellationToken::new();
        let handle = bus.spawn_processor(first.clone()).expect("processor");
        assert!(bus.spawn_processor(CancellationToken::new()).is_none());
        first.cancel();
        handle.await.expect("processor exits");

        let ctx = CancellationToken::new();
        bus.publish(A(1), &ctx).await.expect("publish");
        assert_eq!(bus.queue().len(), 1);

        let handle = bus.spawn_processor(ctx.clone()).expect("second processor");
        wait_until(|| rec.seen.lock().len() == 1).await;
        assert!(bus.queue().is_empty());

        ctx.cancel();
        handle.await.expect("processor exits");
    }

    #[tokio::test]
    async fn test_cancel_mid_drain_keeps_untaken_events() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));
        let mut c = Container::new();
        {
            let (running, peak, done) = (running.clone(), peak.clone(), done.clone());
            c.add_transient(move || Slow {
                running: running.clone(),
                peak: peak.clone(),
                done: done.clone(),
            })
            .expect("register");
        }
        let bus = EventBusBuilder::new(fast(Config {
            queue_processing_mode: ProcessingMode::Sequential,
            ..Config::default()
        }))
        .add_consumer::<Slow>()
        .build_with_container(c)
        .expect("build");

        let ctx = CancellationToken::new();
        for i in 0..6 {
            bus.publish(A(i), &ctx).await.expect("publish");
        }
        let handle = bus.spawn_processor(ctx.clone()).expect("processor");
        let first = Arc::clone(&done);
        wait_until(move || first.load(Ordering::SeqCst) >= 1).await;
        ctx.cancel();
        handle.await.expect("processor exits");

        let handled = done.load(Ordering::SeqCst);
        assert!(handled < 6, "cancel came too late, handled = {handled}");
        assert_eq!(bus.queue().len(), 6 - handled);

        let ctx = CancellationToken::new();
        let handle = bus.spawn_processor(ctx.clone()).expect("second processor");
        let all = Arc::clone(&done);
        wait_until(move || all.load(Ordering::SeqCst) == 6).await;
        assert!(bus.queue().is_empty());
        ctx.cancel();
        handle.await.expect("processor exits");
    }

    /// Fails the first `fail_first` scope creations and remembers when each was asked for.
    struct ScopeFails {
        inner: WithRecorder,
        fail_first: usize,
        asked: Mutex<Vec<Instant>>,
    }
    impl ConsumerProvider for ScopeFails {
        fn get_consumers(&self, ty: ConsumerType) -> Result<Vec<Instance>, ProviderError> {
            self.inner.get_consumers(ty)
        }
    }
    impl ScopeFactory for ScopeFails {
        fn create_scope(&self) -> Result<Arc<dyn ConsumerProvider>, ProviderError> {
            let mut asked = self.asked.lock();
            asked.push(Instant::now());
            if asked.len() <= self.fail_first {
                return Err(ProviderError::Scope {
                    reason: "not ready".into(),
                });
            }
            self.inner.create_scope()
        }
    }

    fn scope_fails(rec: &Arc<Recorder>, fail_first: usize) -> Arc<ScopeFails> {
        Arc::new(ScopeFails {
            inner: WithRecorder {
                container: Container::new(),
                rec: Arc::clone(rec),
            },
            fail_first,
            asked: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_scope_failure_loses_no_event() {
        let rec = Arc::new(Recorder::default());
        let scopes = scope_fails(&rec, 1);
        let bus = EventBusBuilder::new(fast(Config::default()))
            .add_consumer::<Recorder>()
            .build(Arc::clone(&scopes));
        let mut rx = bus.subscribe_signals();

        let ctx = CancellationToken::new();
        bus.publish(A(1), &ctx).await.expect("publish");
        bus.publish(A(2), &ctx).await.expect("publish");
        let handle = bus.spawn_processor(ctx.clone()).expect("processor");

        wait_until(|| rec.seen.lock().len() == 2).await;
        assert_eq!(*rec.seen.lock(), vec!["A", "A"]);
        assert!(bus.queue().is_empty());
        assert_eq!(scopes.asked.lock().len(), 2);

        ctx.cancel();
        handle.await.expect("processor exits");

        let mut loop_failures = 0;
        while let Ok(sig) = rx.try_recv() {
            if sig.kind == SignalKind::QueueLoopFailed {
                loop_failures += 1;
            }
        }
        assert_eq!(loop_failures, 1);
    }

    #[tokio::test]
    async fn test_loop_failure_waits_error_tick_rate() {
        let rec = Arc::new(Recorder::default());
        let scopes = scope_fails(&rec, 1);
        let bus = EventBusBuilder::new(Config {
            queue_tick_rate: Duration::from_millis(5),
            error_tick_rate: Duration::from_millis(150),
            ..Config::default()
        })
        .add_consumer::<Recorder>()
        .build(Arc::clone(&scopes));

        let ctx = CancellationToken::new();
        bus.publish(A(1), &ctx).await.expect("publish");
        let handle = bus.spawn_processor(ctx.clone()).expect("processor");
        wait_until(|| rec.seen.lock().len() == 1).await;
        ctx.cancel();
        handle.await.expect("processor exits");

        let asked = scopes.asked.lock();
        assert_eq!(asked.len(), 2);
        let retry = asked[1].duration_since(asked[0]);
        assert!(
            retry >= Duration::from_millis(140),
            "retried after {retry:?}, expected the error tick"
        );
    }

    /// Gives up on every `C` by itself.
    struct Quitter;
    #[async_trait]
    impl Consume<C> for Quitter {
        async fn consume(&self, _: &C, _: CancellationToken) -> Result<(), ConsumeError> {
            Err(ConsumeError::Canceled)
        }
    }
    impl Consumer for Quitter {
        fn handlers(h: &mut Handlers<Self>) {
            h.on::<C>();
        }
    }

    #[tokio::test]
    async fn test_handler_cancellation_is_recorded_while_running() {
        let rec = Arc::new(Recorder::default());
        let mut c = Container::new();
        c.add_singleton(Quitter).expect("register");
        let bus = EventBusBuilder::new(fast(Config {
            use_error_queue: true,
            ..Config::default()
        }))
        .add_consumer::<Quitter>()
        .add_consumer::<Recorder>()
        .build(Arc::new(WithRecorder {
            container: c,
            rec: Arc::clone(&rec),
        }));

        let ctx = CancellationToken::new();
        let handle = bus.spawn_processor(ctx.clone()).expect("processor");
        bus.publish(C, &ctx).await.expect("publish");
        wait_until(|| !bus.failed_events().is_empty()).await;

        let failures = bus.failed_events();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].consumer, Some(ConsumerType::of::<Quitter>()));
        assert_eq!(failures[0].error, ConsumeError::Canceled);
        assert!(failures[0].event.is::<C>());

        ctx.cancel();
        handle.await.expect("processor exits");
    }

    // `Leaf` implements the `Base` interface; `M` only knows `Base`.
    trait Base: Send + Sync {
        fn depth(&self) -> u32;
    }
    struct AnyBase(Arc<dyn Base>);
    impl Event for AnyBase {}
    struct Leaf;
    impl Base for Leaf {
        fn depth(&self) -> u32 {
            2
        }
    }
    impl Event for Leaf {
        fn supertypes() -> Vec<Supertype> {
            vec![Supertype::new::<Leaf, AnyBase>(|l| AnyBase(l))]
        }
    }
    #[derive(Default)]
    struct M {
        depth: AtomicUsize,
    }
    #[async_trait]
    impl Consume<AnyBase> for M {
        async fn consume(&self, e: &AnyBase, _: CancellationToken) -> Result<(), ConsumeError> {
            self.depth.store(e.0.depth() as usize, Ordering::SeqCst);
            Ok(())
        }
    }
    impl Consumer for M {
        fn handlers(h: &mut Handlers<Self>) {
            h.on::<AnyBase>();
        }
    }

    #[tokio::test]
    async fn test_published_leaf_reaches_interface_consumer() {
        let m = Arc::new(M::default());
        struct One(Arc<M>);
        impl ConsumerProvider for One {
            fn get_consumers(&self, _: ConsumerType) -> Result<Vec<Instance>, ProviderError> {
                Ok(vec![self.0.clone() as Instance])
            }
        }
        impl ScopeFactory for One {
            fn create_scope(&self) -> Result<Arc<dyn ConsumerProvider>, ProviderError> {
                Ok(Arc::new(One(self.0.clone())))
            }
        }

        let bus = EventBusBuilder::new(fast(Config {
            use_event_polymorphism: true,
            ..Config::default()
        }))
        .add_consumer::<M>()
        .build(Arc::new(One(Arc::clone(&m))));

        assert_eq!(
            bus.resolver().resolve(&crate::events::EventType::of::<Leaf>()),
            vec![ConsumerType::of::<M>()]
        );

        let ctx = CancellationToken::new();
        let handle = bus.spawn_processor(ctx.clone()).expect("processor");
        bus.publish(Leaf, &ctx).await.expect("publish");
        let seen = Arc::clone(&m);
        wait_until(move || seen.depth.load(Ordering::SeqCst) == 2).await;
        ctx.cancel();
        handle.await.expect("processor exits");
    }
}
