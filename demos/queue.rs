//! # Example: Queued delivery with an error queue
//!
//! Publishes a batch of jobs, lets the background processor deliver them in
//! parallel under a gate of 2, then prints the recorded failures and counters.
//!
//! Run with: `RUST_LOG=info cargo run --example queue`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use polybus::{
    Config, Consume, ConsumeError, Consumer, Container, DispatchCounters, Event, EventBusBuilder,
    Handlers, ProcessingMode, SignalKind, Subscribe,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

struct Job {
    id: u32,
}
impl Event for Job {}

struct Worker;

#[async_trait]
impl Consume<Job> for Worker {
    async fn consume(&self, job: &Job, ctx: CancellationToken) -> Result<(), ConsumeError> {
        tokio::select! {
            _ = ctx.cancelled() => return Err(ConsumeError::Canceled),
            _ = tokio::time::sleep(Duration::from_millis(50)) => {}
        }
        if job.id % 4 == 0 {
            return Err(ConsumeError::fail(format!("job {} rejected", job.id)));
        }
        println!("[worker] job {} done", job.id);
        Ok(())
    }
}

impl Consumer for Worker {
    fn handlers(h: &mut Handlers<Self>) {
        h.on::<Job>();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut container = Container::new();
    container.add_transient(|| Worker)?;

    let counters = Arc::new(DispatchCounters::new());
    let subs: Vec<Arc<dyn Subscribe>> = vec![counters.clone()];

    let cfg = Config {
        use_error_queue: true,
        queue_processing_mode: ProcessingMode::Parallel,
        concurrent_task_limit: 2,
        queue_tick_rate: Duration::from_millis(10),
        ..Config::default()
    };
    let bus = EventBusBuilder::new(cfg)
        .add_consumer::<Worker>()
        .with_subscribers(subs)
        .build_with_container(container)?;

    let ctx = CancellationToken::new();
    let processor = bus.spawn_processor(ctx.child_token());

    for id in 1..=8 {
        bus.publish(Job { id }, &ctx).await?;
    }

    tokio::time::sleep(Duration::from_millis(500)).await;
    ctx.cancel();
    if let Some(handle) = processor {
        handle.await?;
    }

    for failed in bus.failed_events() {
        let consumer = failed.consumer.map(|c| c.name()).unwrap_or("-");
        println!(
            "[failed] {} by {consumer}: {}",
            failed.event.name(),
            failed.error
        );
    }
    println!(
        "[counters] published={} processed={} failed={}",
        counters.count(SignalKind::EventPublished, "Job"),
        counters.count(SignalKind::EventProcessed, "Job"),
        counters.count(SignalKind::ConsumerFailed, "Job"),
    );
    Ok(())
}
