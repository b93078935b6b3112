//! # Example: Polymorphic routing
//!
//! `Circle` and `Square` both implement the `Shape` interface. `AreaLogger` only
//! declares the `AnyShape` view, yet receives both once polymorphism is enabled.
//! Signals are printed by the built-in `LogWriter`.
//!
//! Run with: `RUST_LOG=info cargo run --example polymorphic --features logging`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use polybus::{
    Config, Consume, ConsumeError, Consumer, Container, Event, EventBusBuilder, EventType,
    Handlers, LogWriter, Subscribe, Supertype,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

trait Shape: Send + Sync {
    fn area(&self) -> f64;
}

/// Interface view of any shape.
struct AnyShape(Arc<dyn Shape>);
impl Event for AnyShape {}

struct Circle {
    r: f64,
}
impl Shape for Circle {
    fn area(&self) -> f64 {
        std::f64::consts::PI * self.r * self.r
    }
}
impl Event for Circle {
    fn supertypes() -> Vec<Supertype> {
        vec![Supertype::new::<Circle, AnyShape>(|c| AnyShape(c))]
    }
}

struct Square {
    side: f64,
}
impl Shape for Square {
    fn area(&self) -> f64 {
        self.side * self.side
    }
}
impl Event for Square {
    fn supertypes() -> Vec<Supertype> {
        vec![Supertype::new::<Square, AnyShape>(|s| AnyShape(s))]
    }
}

struct AreaLogger;

#[async_trait]
impl Consume<AnyShape> for AreaLogger {
    async fn consume(&self, shape: &AnyShape, _ctx: CancellationToken) -> Result<(), ConsumeError> {
        println!("[area] {:.2}", shape.0.area());
        Ok(())
    }
}

impl Consumer for AreaLogger {
    fn handlers(h: &mut Handlers<Self>) {
        h.on::<AnyShape>();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut container = Container::new();
    container.add_singleton(AreaLogger)?;

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let bus = EventBusBuilder::new(Config {
        use_event_polymorphism: true,
        ..Config::default()
    })
    .add_consumer::<AreaLogger>()
    .with_subscribers(subs)
    .build_with_container(container)?;

    println!(
        "[resolve] Circle -> {:?}",
        bus.resolver().resolve(&EventType::of::<Circle>())
    );

    let ctx = CancellationToken::new();
    let processor = bus.spawn_processor(ctx.clone());

    bus.send(Circle { r: 1.0 }, &ctx).await?;
    bus.publish(Square { side: 3.0 }, &ctx).await?;

    tokio::time::sleep(Duration::from_millis(100)).await;
    ctx.cancel();
    if let Some(handle) = processor {
        handle.await?;
    }
    Ok(())
}
