//! Symbol-sharded dispatch.
//!
//! Each shard worker owns the books, acceptance clocks and last-price
//! entries of a disjoint set of symbols and processes its records strictly
//! in arrival order; parallelism exists only across shards. Batches return
//! the ids of failed records so the transport redelivers exactly those.

use crate::dedup::{DedupStore, Freshness};
use crate::engine::book::SymbolBook;
use crate::engine::matching::{self, TakerOutcome};
use crate::engine::types::Order;
use crate::engine::validate::validate;
use crate::pipeline::clock::AcceptanceClock;
use crate::pipeline::quotes::LastPriceStore;
use crate::pipeline::sink::{AnalyticsSink, DurableTradeSink, SinkError, TradePublisher};
use crate::pipeline::source::InboundRecord;
use crate::wire::{OrderRecord, TradeRecord};
use chrono::Utc;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Result of one batch: the transport redelivers exactly these record ids.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordOutcome {
    Acked,
    Failed,
}

struct WorkItem {
    record_id: String,
    order: OrderRecord,
    done: oneshot::Sender<RecordOutcome>,
}

/// Everything a shard worker needs besides its own books.
#[derive(Clone)]
pub struct PipelineDeps {
    pub guard: Arc<dyn DedupStore>,
    pub durable: Arc<dyn DurableTradeSink>,
    pub publisher: Arc<dyn TradePublisher>,
    pub analytics: Option<Arc<dyn AnalyticsSink>>,
    pub quotes: Arc<LastPriceStore>,
    pub guard_timeout: Duration,
    pub sink_timeout: Duration,
}

/// Routes inbound records to shard workers and collects batch outcomes.
pub struct Dispatcher {
    workers: Vec<mpsc::Sender<WorkItem>>,
    routes: HashMap<String, usize>,
}

impl Dispatcher {
    /// Spawn `shards` workers. `routes` pins symbols to shards; anything
    /// unlisted hashes onto a shard, so one symbol always lands on one
    /// worker and per-symbol ordering holds.
    pub fn spawn(shards: usize, routes: HashMap<String, usize>, deps: PipelineDeps) -> Dispatcher {
        assert!(shards > 0, "dispatcher needs at least one shard");
        let routes = routes
            .into_iter()
            .map(|(symbol, shard)| (symbol.trim().to_ascii_uppercase(), shard))
            .collect();
        let mut workers = Vec::with_capacity(shards);
        for shard in 0..shards {
            let (tx, rx) = mpsc::channel(1024);
            let worker = Worker::new(shard, deps.clone());
            tokio::spawn(worker.run(rx));
            workers.push(tx);
        }
        Dispatcher { workers, routes }
    }

    fn route(&self, symbol: &str) -> usize {
        let canonical = symbol.trim().to_ascii_uppercase();
        if let Some(shard) = self.routes.get(&canonical) {
            return *shard;
        }
        let mut hasher = DefaultHasher::new();
        canonical.hash(&mut hasher);
        (hasher.finish() as usize) % self.workers.len()
    }

    /// Process one batch of records. Records for the same symbol keep their
    /// relative order; the call returns once every record is settled.
    pub async fn process_batch(&self, records: Vec<InboundRecord>) -> BatchOutcome {
        let mut pending = Vec::with_capacity(records.len());
        let mut failures = Vec::new();

        for record in records {
            // Decode here so the record can be routed by symbol. A body that
            // is not JSON is dead-lettered: acked, logged, never retried.
            let order: OrderRecord = match serde_json::from_str(&record.body) {
                Ok(order) => order,
                Err(err) => {
                    warn!(record_id = %record.record_id, %err, "undecodable record, dead-lettering");
                    continue;
                }
            };

            let shard = self.route(order.symbol.as_deref().unwrap_or(""));
            let (done_tx, done_rx) = oneshot::channel();
            let item = WorkItem {
                record_id: record.record_id.clone(),
                order,
                done: done_tx,
            };
            if self.workers[shard].send(item).await.is_err() {
                // Worker gone (fatal error path); let the transport retry.
                failures.push(record.record_id);
                continue;
            }
            pending.push((record.record_id, done_rx));
        }

        for (record_id, done) in pending {
            match done.await {
                Ok(RecordOutcome::Acked) => {}
                Ok(RecordOutcome::Failed) | Err(_) => failures.push(record_id),
            }
        }
        BatchOutcome { failures }
    }
}

/// One shard worker: single writer for all of its symbols' books.
struct Worker {
    shard: usize,
    books: HashMap<String, SymbolBook>,
    clocks: HashMap<String, AcceptanceClock>,
    deps: PipelineDeps,
}

impl Worker {
    fn new(shard: usize, deps: PipelineDeps) -> Self {
        Self {
            shard,
            books: HashMap::new(),
            clocks: HashMap::new(),
            deps,
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<WorkItem>) {
        info!(shard = self.shard, "shard worker started");
        while let Some(item) = rx.recv().await {
            let outcome = self.process(item.order, &item.record_id).await;
            let _ = item.done.send(outcome);
        }
        info!(shard = self.shard, "shard worker stopped");
    }

    async fn process(&mut self, raw: OrderRecord, record_id: &str) -> RecordOutcome {
        // Validate. A rejected order is a settled record: ack it.
        let mut order = match validate(raw) {
            Ok(order) => order,
            Err(err) => {
                warn!(%record_id, %err, "order rejected by validation");
                return RecordOutcome::Acked;
            }
        };

        // Consult the guard before anything can have side effects.
        match timeout(
            self.deps.guard_timeout,
            self.deps.guard.check_and_mark(&order.order_id),
        )
        .await
        {
            Ok(Ok(Freshness::Fresh)) => {}
            Ok(Ok(Freshness::Duplicate)) => {
                debug!(order_id = %order.order_id, "duplicate delivery absorbed");
                return RecordOutcome::Acked;
            }
            Ok(Err(err)) => {
                warn!(order_id = %order.order_id, %err, "idempotency guard failed");
                return RecordOutcome::Failed;
            }
            Err(_) => {
                warn!(order_id = %order.order_id, "idempotency guard timed out");
                return RecordOutcome::Failed;
            }
        }

        // Acceptance stamp: the one and only time-priority input.
        let symbol = order.symbol.clone();
        order.accepted_at = self
            .clocks
            .entry(symbol.clone())
            .or_insert_with(AcceptanceClock::new)
            .stamp();
        let book = self
            .books
            .entry(symbol.clone())
            .or_insert_with(|| SymbolBook::new(symbol.clone()));

        // Plan the match without touching the book, persist the trades,
        // and only then commit book mutations.
        let plan = matching::plan(&order, book);
        let executed_at = Utc::now().timestamp_millis() as u64;
        let trades: Vec<TradeRecord> = plan
            .fills
            .iter()
            .map(|fill| TradeRecord::from_trade(&fill.to_trade(&order, executed_at)))
            .collect();

        if !trades.is_empty() {
            match timeout(self.deps.sink_timeout, self.deps.durable.persist(&trades)).await {
                Ok(Ok(())) => {}
                Ok(Err(SinkError::Fatal(msg))) => {
                    error!(order_id = %order.order_id, %msg, "durable trade sink failed fatally");
                    panic!("durable trade sink failed fatally: {msg}");
                }
                Ok(Err(err @ SinkError::Transient(_))) => {
                    warn!(order_id = %order.order_id, %err, "durable trade sink failed, will retry");
                    self.release_mark(&order).await;
                    return RecordOutcome::Failed;
                }
                Err(_) => {
                    warn!(order_id = %order.order_id, "durable trade sink timed out, will retry");
                    self.release_mark(&order).await;
                    return RecordOutcome::Failed;
                }
            }
        }

        if let Err(err) = matching::commit(&order, &plan, book) {
            error!(order_id = %order.order_id, %err, "book invariant violated");
            panic!("book invariant violated: {err}");
        }

        if !trades.is_empty() {
            // The durable sink already owns these trades and the books are
            // committed; a publish failure is retried as a batch item, and
            // the guard then absorbs the redelivery without re-matching.
            match timeout(self.deps.sink_timeout, self.deps.publisher.publish(&trades)).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(order_id = %order.order_id, %err, "trade publish failed");
                    return RecordOutcome::Failed;
                }
                Err(_) => {
                    warn!(order_id = %order.order_id, "trade publish timed out");
                    return RecordOutcome::Failed;
                }
            }

            if let Some(analytics) = &self.deps.analytics {
                for trade in &trades {
                    match timeout(self.deps.sink_timeout, analytics.observe(trade)).await {
                        Ok(Ok(())) => {}
                        Ok(Err(err)) => {
                            warn!(trade_id = %trade.trade_id, %err, "analytics sink failed")
                        }
                        Err(_) => warn!(trade_id = %trade.trade_id, "analytics sink timed out"),
                    }
                }
            }

            if let Some(last) = plan.fills.last() {
                self.deps.quotes.record(&symbol, last.price);
            }
        }

        self.log_outcome(&order, &plan.outcome, trades.len());
        RecordOutcome::Acked
    }

    /// Failed records must stay retryable: drop the guard mark so the
    /// transport's redelivery is not absorbed as a duplicate.
    async fn release_mark(&self, order: &Order) {
        if let Err(err) = self.deps.guard.unmark(&order.order_id).await {
            // The mark ages out with its TTL; until then the redelivery is
            // swallowed and this order is lost to SLA.
            warn!(order_id = %order.order_id, %err, "failed to release idempotency mark");
        }
    }

    fn log_outcome(&self, order: &Order, outcome: &TakerOutcome, trade_count: usize) {
        match outcome {
            TakerOutcome::Filled => {
                info!(shard = self.shard, order_id = %order.order_id, symbol = %order.symbol,
                      trades = trade_count, "order filled")
            }
            TakerOutcome::Rests => {
                info!(shard = self.shard, order_id = %order.order_id, symbol = %order.symbol,
                      trades = trade_count, "order resting")
            }
            TakerOutcome::Discarded => {
                info!(shard = self.shard, order_id = %order.order_id, symbol = %order.symbol,
                      trades = trade_count, "market order remainder discarded")
            }
            TakerOutcome::RejectedNoLiquidity => {
                info!(shard = self.shard, order_id = %order.order_id, symbol = %order.symbol,
                      "market order rejected: no liquidity")
            }
        }
    }
}
