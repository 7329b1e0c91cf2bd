//! funnel-loadgen — synthetic traffic generator for the sales-funnel
//! feature store.
//!
//! Simulates a SaaS product where:
//!
//! 1. Users land on a home page and become leads.
//! 2. Lead info gets logged to the database.
//! 3. A conversion prediction is published to the broker.
//! 4. Leads unlikely to convert may get a coupon.
//! 5. Converting leads are scheduled to convert at some random time in
//!    the near future, drained by the scheduler loop.
//!
//! # Usage
//!
//! ```bash
//! # Defaults from the environment (PG_*, BROKER_ENDPOINT, SIM_*)
//! funnel-loadgen
//!
//! # Faster cadence, coarser polling
//! funnel-loadgen --lead-interval-ms 5 --poll-period-ms 100
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::Notify;

use funnel_core::config::{load_dotenv, Config};
use funnel_pipeline::LeadPipeline;
use funnel_publish::ZmqPredictionPublisher;
use funnel_scheduler::{DelayQueue, SchedulerLoop};
use funnel_store::PgFunnelStore;

/// Synthetic traffic generator for the sales-funnel feature store.
#[derive(Parser, Debug)]
#[command(name = "funnel-loadgen", version, about)]
struct Cli {
    /// Milliseconds between lead pipeline iterations.
    #[arg(long, env = "SIM_LEAD_INTERVAL_MS")]
    lead_interval_ms: Option<u64>,

    /// Scheduler polling granularity in milliseconds.
    #[arg(long, env = "SIM_POLL_PERIOD_MS")]
    poll_period_ms: Option<u64>,

    /// ZeroMQ endpoint the prediction PUB socket binds to.
    #[arg(long, env = "BROKER_ENDPOINT")]
    broker_endpoint: Option<String>,

    /// Apply schema migrations before starting.
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(ms) = cli.lead_interval_ms {
        config.sim.lead_interval_ms = ms;
    }
    if let Some(ms) = cli.poll_period_ms {
        config.sim.poll_period_ms = ms;
    }
    if let Some(endpoint) = cli.broker_endpoint {
        config.broker.endpoint = endpoint;
    }
    config.log_summary();

    let store = PgFunnelStore::connect(&config.postgres).await?;
    if cli.migrate {
        store.migrate().await?;
        tracing::info!("schema migrations applied");
    }

    let publisher = ZmqPredictionPublisher::bind(&config.broker.endpoint).await?;

    // The one shared resource between the two workers.
    let queue = Arc::new(DelayQueue::new());

    // One shutdown handle per worker: notify_one stores a permit, so a
    // loop that is mid-iteration when the signal lands still sees it.
    let stop_consumer = Arc::new(Notify::new());
    let stop_producer = Arc::new(Notify::new());

    {
        let stop_consumer = stop_consumer.clone();
        let stop_producer = stop_producer.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            tracing::info!("shutdown signal received");
            stop_producer.notify_one();
            stop_consumer.notify_one();
        });
    }

    // Consumer: drains due conversions against the store.
    let scheduler = SchedulerLoop::new(
        queue.clone(),
        store.clone(),
        Duration::from_millis(config.sim.poll_period_ms),
    );
    let metrics = scheduler.metrics();
    let consumer = tokio::spawn(async move { scheduler.run(stop_consumer).await });

    // Producer: fabricates leads on a fixed cadence (blocks until shutdown).
    tracing::info!("starting loadgen");
    let pipeline = LeadPipeline::new(store, publisher, queue.clone(), config.sim.clone());
    pipeline.run(stop_producer).await;

    consumer.await?;
    tracing::info!(
        finalized = metrics.finalized(),
        requeued = metrics.requeued(),
        pending = queue.len().await,
        "loadgen stopped"
    );
    Ok(())
}

/// Wait for SIGINT or SIGTERM (Unix) or Ctrl+C (cross-platform fallback).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to register SIGINT");
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM");
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl_c");
    }
}
