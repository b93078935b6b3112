//! # Example: Immediate delivery
//!
//! Two consumers handle `OrderPlaced`; one of them also handles `OrderCancelled`.
//! Runs `send` in parallel mode, then in sequential mode with a failing consumer.
//!
//! Run with: `RUST_LOG=debug cargo run --example send`

use async_trait::async_trait;
use polybus::{
    BusError, Config, Consume, ConsumeError, Consumer, Container, Event, EventBusBuilder, Handlers,
    ProcessingMode,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

struct OrderPlaced {
    id: u64,
    total_cents: u64,
}
impl Event for OrderPlaced {}

struct OrderCancelled {
    id: u64,
}
impl Event for OrderCancelled {}

struct Mailer;

#[async_trait]
impl Consume<OrderPlaced> for Mailer {
    async fn consume(&self, e: &OrderPlaced, _ctx: CancellationToken) -> Result<(), ConsumeError> {
        println!("[mailer] confirmation for order {}", e.id);
        Ok(())
    }
}

#[async_trait]
impl Consume<OrderCancelled> for Mailer {
    async fn consume(&self, e: &OrderCancelled, _ctx: CancellationToken) -> Result<(), ConsumeError> {
        println!("[mailer] cancellation notice for order {}", e.id);
        Ok(())
    }
}

impl Consumer for Mailer {
    fn handlers(h: &mut Handlers<Self>) {
        h.on::<OrderPlaced>().on::<OrderCancelled>();
    }
}

struct Billing {
    limit_cents: u64,
}

#[async_trait]
impl Consume<OrderPlaced> for Billing {
    async fn consume(&self, e: &OrderPlaced, _ctx: CancellationToken) -> Result<(), ConsumeError> {
        if e.total_cents > self.limit_cents {
            return Err(ConsumeError::fail(format!(
                "order {} over limit ({} > {})",
                e.id, e.total_cents, self.limit_cents
            )));
        }
        println!("[billing] charged {} cents for order {}", e.total_cents, e.id);
        Ok(())
    }
}

impl Consumer for Billing {
    fn handlers(h: &mut Handlers<Self>) {
        h.on::<OrderPlaced>();
    }
}

fn container() -> anyhow::Result<Container> {
    let mut c = Container::new();
    c.add_singleton(Mailer)?
        .add_scoped(|| Billing { limit_cents: 10_000 })?;
    Ok(c)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let ctx = CancellationToken::new();

    let bus = EventBusBuilder::new(Config::default())
        .add_consumer::<Mailer>()
        .add_consumer::<Billing>()
        .build_with_container(container()?)?;

    bus.send(OrderPlaced { id: 1, total_cents: 2_500 }, &ctx).await?;
    bus.send(OrderCancelled { id: 1 }, &ctx).await?;

    let sequential = EventBusBuilder::new(Config {
        consumer_execution_mode: ProcessingMode::Sequential,
        ..Config::default()
    })
    .add_consumer::<Billing>()
    .add_consumer::<Mailer>()
    .build_with_container(container()?)?;

    match sequential
        .send(OrderPlaced { id: 2, total_cents: 50_000 }, &ctx)
        .await
    {
        Err(BusError::Consumer { consumer, source }) => {
            println!("[main] {consumer} stopped the fan-out: {source}");
        }
        other => println!("[main] unexpected outcome: {other:?}"),
    }

    Ok(())
}
