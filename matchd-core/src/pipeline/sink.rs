//! Trade sinks: durable storage, outbound publication, analytics.
//!
//! The per-record ordering is durable first, publish second: the durable
//! sink is the source of truth, and book mutations commit only after it has
//! the trades. Analytics is best effort and never fails a record.

use crate::wire::TradeRecord;
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode};
use std::fmt;
use tokio::sync::broadcast;
use tracing::debug;

/// SinkError separates retryable trouble from misconfiguration.
#[derive(Debug)]
pub enum SinkError {
    /// Worth retrying: the record fails the batch and is redelivered.
    Transient(String),
    /// Auth/schema class failure: the worker cannot make progress.
    Fatal(String),
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Transient(msg) => write!(f, "transient sink failure: {msg}"),
            SinkError::Fatal(msg) => write!(f, "fatal sink failure: {msg}"),
        }
    }
}

impl std::error::Error for SinkError {}

/// Durable trade storage. All trades of one taker are persisted atomically.
#[async_trait]
pub trait DurableTradeSink: Send + Sync {
    async fn persist(&self, trades: &[TradeRecord]) -> Result<(), SinkError>;
}

/// Outbound trade stream, keyed by symbol (each record carries its symbol).
#[async_trait]
pub trait TradePublisher: Send + Sync {
    async fn publish(&self, trades: &[TradeRecord]) -> Result<(), SinkError>;
}

/// Optional analytics feed; failures are logged by the caller and swallowed.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn observe(&self, trade: &TradeRecord) -> Result<(), SinkError>;
}

const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;

CREATE TABLE IF NOT EXISTS trades (
    trade_id TEXT PRIMARY KEY,
    symbol TEXT NOT NULL,
    buy_order_id TEXT NOT NULL,
    sell_order_id TEXT NOT NULL,
    buyer_id TEXT NOT NULL,
    seller_id TEXT NOT NULL,
    price TEXT NOT NULL,
    quantity TEXT NOT NULL,
    total_value TEXT NOT NULL,
    timestamp INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_trades_symbol_time ON trades(symbol, timestamp);
"#;

/// SQLite-backed durable sink. One transaction per taker batch; trade ids
/// are the primary key, so re-persisting after a half-failed batch is safe.
pub struct SqliteTradeSink {
    conn: Mutex<Connection>,
}

impl SqliteTradeSink {
    /// Open (or create) the trade store. `:memory:` is accepted for tests
    /// and ephemeral runs.
    pub fn open(path: &str) -> anyhow::Result<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of stored trades, for diagnostics and tests.
    pub fn trade_count(&self) -> anyhow::Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM trades", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn map_error(err: rusqlite::Error) -> SinkError {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == ErrorCode::DatabaseBusy || e.code == ErrorCode::DatabaseLocked =>
            {
                SinkError::Transient(err.to_string())
            }
            _ => SinkError::Fatal(err.to_string()),
        }
    }
}

#[async_trait]
impl DurableTradeSink for SqliteTradeSink {
    async fn persist(&self, trades: &[TradeRecord]) -> Result<(), SinkError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(Self::map_error)?;
        {
            let mut insert = tx
                .prepare_cached(
                    "INSERT OR IGNORE INTO trades \
                     (trade_id, symbol, buy_order_id, sell_order_id, buyer_id, seller_id, \
                      price, quantity, total_value, timestamp) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                )
                .map_err(Self::map_error)?;
            for trade in trades {
                insert
                    .execute(params![
                        trade.trade_id,
                        trade.symbol,
                        trade.buy_order_id,
                        trade.sell_order_id,
                        trade.buyer_id,
                        trade.seller_id,
                        trade.price,
                        trade.quantity,
                        trade.total_value,
                        trade.timestamp as i64,
                    ])
                    .map_err(Self::map_error)?;
            }
        }
        tx.commit().map_err(Self::map_error)
    }
}

/// In-process publisher over a broadcast channel; websocket fan-out and
/// other consumers subscribe. A send with no live subscribers is not a
/// failure: the durable sink already has the trades.
pub struct BroadcastPublisher {
    tx: broadcast::Sender<TradeRecord>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TradeRecord> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl TradePublisher for BroadcastPublisher {
    async fn publish(&self, trades: &[TradeRecord]) -> Result<(), SinkError> {
        for trade in trades {
            if self.tx.send(trade.clone()).is_err() {
                debug!(trade_id = %trade.trade_id, "no trade subscribers");
            }
        }
        Ok(())
    }
}

/// Fire-and-forget analytics over HTTP POST.
pub struct HttpAnalyticsSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAnalyticsSink {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl AnalyticsSink for HttpAnalyticsSink {
    async fn observe(&self, trade: &TradeRecord) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(trade)
            .send()
            .await
            .map_err(|e| SinkError::Transient(e.to_string()))?;
        response
            .error_for_status()
            .map_err(|e| SinkError::Transient(e.to_string()))?;
        Ok(())
    }
}

/// Collecting sink for tests and dry runs.
#[derive(Default)]
pub struct MemoryTradeSink {
    trades: Mutex<Vec<TradeRecord>>,
}

impl MemoryTradeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trades(&self) -> Vec<TradeRecord> {
        self.trades.lock().clone()
    }
}

#[async_trait]
impl DurableTradeSink for MemoryTradeSink {
    async fn persist(&self, trades: &[TradeRecord]) -> Result<(), SinkError> {
        self.trades.lock().extend_from_slice(trades);
        Ok(())
    }
}
