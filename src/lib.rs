//! # polybus
//!
//! **Polybus** is an in-process publish/subscribe event bus for Rust.
//!
//! Producers emit typed event values; the consumers registered for the event's type
//! (optionally also for its supertypes or subtypes) handle them, either right away
//! in the caller's task or later from a background queue.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ConsumerRegistry ── build_resolver(poly) ──► ConsumerTypeResolver
//!   (consumer → events)                          (event → consumers)
//!                                                        │
//! ┌──────────────────────────────────────────────────────▼────────────┐
//! │  EventBus                                                         │
//! │  - send(event)    → resolve → provider → handlers (awaited)       │
//! │  - publish(event) → EventQueue                                    │
//! │  - SignalBus (broadcast dispatch signals)                         │
//! └──────┬───────────────────────────────────┬────────────────────────┘
//!        │ spawn_processor(token)            │ signals
//!        ▼                                   ▼
//! ┌──────────────────────────┐     ┌────────────────────────┐
//! │ QueueProcessor           │     │  signal_listener       │
//! │ Idle → Draining → tick   │     └───────────┬────────────┘
//! │ scope per pass           │                 ▼
//! │ Sequential | Parallel    │           SubscriberSet
//! │ failures → FailedEvent   │        ┌────────┼────────┐
//! └──────────────────────────┘        ▼        ▼        ▼
//!                              DispatchCounters LogWriter custom
//! ```
//!
//! ### Queued delivery
//! ```text
//! publish(A), publish(B) ──► EventQueue [A, B]
//!
//! loop {
//!   ├─► Idle: wait for wake-up (cancellable)
//!   ├─► Draining: for each taken event
//!   │       ├─ resolve consumer types
//!   │       ├─ scope.get_consumers(ty)
//!   │       ├─ Sequential: await handler
//!   │       └─ Parallel:   gate permit ─► spawn handler
//!   │          handler Err/panic ─► log, ConsumerFailed, FailedEvent (opt.)
//!   ├─► pass ok         ─► sleep(queue_tick_rate)
//!   └─► provider error  ─► QueueLoopFailed, sleep(error_tick_rate)
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                              |
//! |-------------------|----------------------------------------------------------|-------------------------------------------------|
//! | **Events**        | Typed payloads with declared supertypes.                 | [`Event`], [`EventType`], [`Supertype`], [`AnyEvent`] |
//! | **Consumers**     | One handler per event type, explicit capability list.    | [`Consume`], [`Consumer`], [`Handlers`]         |
//! | **Routing**       | Exact or polymorphic consumer resolution.                | [`ConsumerRegistry`], [`ConsumerTypeResolver`]  |
//! | **Instances**     | Pluggable instance resolution, built-in container.       | [`ConsumerProvider`], [`ScopeFactory`], [`Container`] |
//! | **Delivery**      | Immediate `send`, queued `publish`.                      | [`EventBus`], [`EventQueue`], [`QueueProcessor`] |
//! | **Observability** | Dispatch signals, counters, subscriber API.              | [`Signal`], [`Subscribe`], [`DispatchCounters`] |
//! | **Errors**        | Typed errors with stable labels.                         | [`BusError`], [`ConsumeError`]                  |
//! | **Configuration** | Centralized dispatch settings.                           | [`Config`], [`ProcessingMode`]                  |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use polybus::{Config, Consume, ConsumeError, Consumer, Container, Event, EventBusBuilder, Handlers};
//!
//! struct OrderPlaced { id: u64 }
//! impl Event for OrderPlaced {}
//!
//! struct Mailer;
//!
//! #[async_trait]
//! impl Consume<OrderPlaced> for Mailer {
//!     async fn consume(&self, e: &OrderPlaced, _ctx: CancellationToken) -> Result<(), ConsumeError> {
//!         println!("mail for order {}", e.id);
//!         Ok(())
//!     }
//! }
//!
//! impl Consumer for Mailer {
//!     fn handlers(h: &mut Handlers<Self>) {
//!         h.on::<OrderPlaced>();
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut container = Container::new();
//!     container.add_singleton(Mailer)?;
//!
//!     let bus = EventBusBuilder::new(Config::default())
//!         .add_consumer::<Mailer>()
//!         .build_with_container(container)?;
//!
//!     let ctx = CancellationToken::new();
//!     let processor = bus.spawn_processor(ctx.clone());
//!
//!     bus.send(OrderPlaced { id: 1 }, &ctx).await?;
//!     bus.publish(OrderPlaced { id: 2 }, &ctx).await?;
//!
//!     ctx.cancel();
//!     if let Some(handle) = processor {
//!         handle.await?;
//!     }
//!     Ok(())
//! }
//! ```
mod consumers;
mod core;
mod error;
mod events;
mod policies;
mod provider;
mod queue;
mod registry;
mod signals;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{Config, EventBus, EventBusBuilder, QueueProcessor};
pub use consumers::{Consume, ConsumeFuture, Consumer, ConsumerType, Handlers};
pub use error::{
    BuildError, BusError, ConsumeError, ConsumerFailure, ContainerError, ProviderError, QueueError,
};
pub use events::{AnyEvent, Event, EventType, Supertype};
pub use policies::ProcessingMode;
pub use provider::{ConsumerProvider, Container, Instance, Lifetime, ScopeFactory};
pub use queue::{Drain, EventQueue, FailedEvent};
pub use registry::{ConsumerRegistry, ConsumerTypeResolver, MatchMode};
pub use signals::{Signal, SignalBus, SignalKind};
pub use subscribers::{DispatchCounters, Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
