//! matchd, the continuous-auction matching engine service.
//!
//! Reads an order stream, matches per symbol, persists and publishes trades.
//! Exit codes: 0 clean shutdown, 1 fatal configuration, 2 fatal dependency
//! unavailable at startup.

use anyhow::{Context, Result};
use dotenv::dotenv;
use matchd_core::config::{Config, DedupBackend};
use matchd_core::dedup::{DedupStore, ExternalKvDedup, InMemoryDedup};
use matchd_core::pipeline::dispatch::{Dispatcher, PipelineDeps};
use matchd_core::pipeline::quotes::LastPriceStore;
use matchd_core::pipeline::sink::{
    AnalyticsSink, BroadcastPublisher, HttpAnalyticsSink, SqliteTradeSink,
};
use matchd_core::pipeline::source::{NdjsonSource, RecordSource};
use mimalloc::MiMalloc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Global allocator
/// Requires the `mimalloc` feature to be enabled in the `Cargo.toml` file.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const EXIT_CONFIG: i32 = 1;
const EXIT_DEPENDENCY: i32 = 2;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("matchd=info,matchd_core=info")),
        )
        .init();

    let config_path: Option<PathBuf> = std::env::args().nth(1).map(PathBuf::from);
    let config = match Config::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!("invalid configuration: {err:#}");
            std::process::exit(EXIT_CONFIG);
        }
    };

    match run(config).await {
        Ok(()) => info!("shutdown complete"),
        Err(err) => {
            error!("startup dependency unavailable: {err:#}");
            std::process::exit(EXIT_DEPENDENCY);
        }
    }
}

async fn run(config: Config) -> Result<()> {
    let durable = Arc::new(
        SqliteTradeSink::open(&config.sink.durable)
            .with_context(|| format!("opening durable trade sink {}", config.sink.durable))?,
    );

    let guard: Arc<dyn DedupStore> = match config.idempotency.backend {
        DedupBackend::InMemory => {
            let guard = Arc::new(InMemoryDedup::new(Duration::from_secs(
                config.idempotency.ttl_seconds,
            )));
            spawn_guard_cleanup(guard.clone());
            guard
        }
        DedupBackend::ExternalKv => {
            let endpoint = config
                .idempotency
                .endpoint
                .clone()
                .context("external_kv backend without endpoint")?;
            let guard = Arc::new(ExternalKvDedup::new(
                endpoint,
                config.idempotency.auth_token.clone().unwrap_or_default(),
                Duration::from_secs(config.idempotency.ttl_seconds),
                Duration::from_secs(config.idempotency.timeout_seconds),
            ));
            guard
                .ping()
                .await
                .context("pinging external idempotency backend")?;
            guard
        }
    };

    let publisher = Arc::new(BroadcastPublisher::new(config.outbound.capacity));
    if config.outbound.trades == "stdout" {
        spawn_stdout_mirror(publisher.subscribe());
    }

    let analytics: Option<Arc<dyn AnalyticsSink>> = config
        .sink
        .analytics
        .clone()
        .map(|endpoint| Arc::new(HttpAnalyticsSink::new(endpoint)) as Arc<dyn AnalyticsSink>);

    let quotes = Arc::new(LastPriceStore::new());
    let dispatcher = Dispatcher::spawn(
        config.symbols.shards,
        config.symbols.workers.clone(),
        PipelineDeps {
            guard,
            durable: durable.clone(),
            publisher: publisher.clone(),
            analytics,
            quotes,
            guard_timeout: Duration::from_secs(config.idempotency.timeout_seconds),
            sink_timeout: Duration::from_secs(config.sink.timeout_seconds),
        },
    );

    let mut source: Box<dyn RecordSource> = match config.inbound.source.as_str() {
        "stdin" => Box::new(NdjsonSource::stdin()),
        path => Box::new(
            NdjsonSource::open(Path::new(path))
                .await
                .context("opening inbound order stream")?,
        ),
    };

    info!(
        source = %config.inbound.source,
        durable = %config.sink.durable,
        shards = config.symbols.shards,
        "matchd accepting orders"
    );

    loop {
        tokio::select! {
            batch = source.next_batch() => {
                match batch {
                    Ok(Some(records)) => {
                        let outcome = dispatcher.process_batch(records).await;
                        if !outcome.failures.is_empty() {
                            // The local NDJSON feed has no redelivery; surface
                            // what a queueing transport would retry.
                            warn!(failed = outcome.failures.len(), ids = ?outcome.failures,
                                  "batch items failed");
                        }
                    }
                    Ok(None) => {
                        info!("order stream drained");
                        break;
                    }
                    Err(err) => {
                        warn!("order stream read failed: {err:#}");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, shutting down");
                break;
            }
        }
    }

    if let Ok(count) = durable.trade_count() {
        info!(trades = count, "durable trade sink totals");
    }
    Ok(())
}

/// Periodically sweep expired idempotency marks.
fn spawn_guard_cleanup(guard: Arc<InMemoryDedup>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            guard.cleanup();
        }
    });
}

/// Mirror published trades to stdout as NDJSON.
fn spawn_stdout_mirror(mut rx: tokio::sync::broadcast::Receiver<matchd_core::wire::TradeRecord>) {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(trade) => match serde_json::to_string(&trade) {
                    Ok(line) => println!("{line}"),
                    Err(err) => warn!("trade serialization failed: {err}"),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "stdout mirror lagged behind trade stream");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
