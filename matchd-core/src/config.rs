//! Service configuration: a TOML file with `MATCHD_*` environment overrides.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub inbound: InboundConfig,
    pub outbound: OutboundConfig,
    pub sink: SinkConfig,
    pub idempotency: IdempotencyConfig,
    pub symbols: SymbolsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InboundConfig {
    /// Order stream endpoint: `stdin` or an NDJSON file path.
    pub source: String,
}

impl Default for InboundConfig {
    fn default() -> Self {
        Self {
            source: "stdin".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutboundConfig {
    /// Trade publication endpoint: `stdout` mirrors the broadcast stream to
    /// standard output, `none` keeps it in-process only.
    pub trades: String,
    /// Broadcast channel capacity per subscriber.
    pub capacity: usize,
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            trades: "stdout".to_string(),
            capacity: 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Durable trade storage: a SQLite path, or `:memory:`.
    pub durable: String,
    /// Optional best-effort analytics endpoint (HTTP POST per trade).
    pub analytics: Option<String>,
    /// Bound on each sink call.
    pub timeout_seconds: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            durable: "trades.db".to_string(),
            analytics: None,
            timeout_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupBackend {
    InMemory,
    ExternalKv,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdempotencyConfig {
    pub ttl_seconds: u64,
    pub backend: DedupBackend,
    /// Required when `backend = external_kv`.
    pub endpoint: Option<String>,
    pub auth_token: Option<String>,
    /// Bound on each guard call.
    pub timeout_seconds: u64,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 3600,
            backend: DedupBackend::InMemory,
            endpoint: None,
            auth_token: None,
            timeout_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SymbolsConfig {
    /// Number of shard workers; each owns a disjoint set of symbols.
    pub shards: usize,
    /// Explicit symbol → shard assignments; unlisted symbols hash.
    pub workers: HashMap<String, usize>,
}

impl Default for SymbolsConfig {
    fn default() -> Self {
        Self {
            shards: 4,
            workers: HashMap::new(),
        }
    }
}

impl Config {
    /// Load the file (when given), then apply environment overrides, then
    /// validate. Any failure here is fatal configuration (exit code 1).
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                toml::from_str(&text)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            None => Config::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(source) = env::var("MATCHD_INBOUND_SOURCE") {
            self.inbound.source = source;
        }
        if let Ok(trades) = env::var("MATCHD_OUTBOUND_TRADES") {
            self.outbound.trades = trades;
        }
        if let Ok(durable) = env::var("MATCHD_SINK_DURABLE") {
            self.sink.durable = durable;
        }
        if let Ok(analytics) = env::var("MATCHD_SINK_ANALYTICS") {
            self.sink.analytics = Some(analytics);
        }
        if let Ok(timeout) = env::var("MATCHD_SINK_TIMEOUT_SECONDS") {
            self.sink.timeout_seconds = timeout
                .parse()
                .context("MATCHD_SINK_TIMEOUT_SECONDS must be an integer")?;
        }
        if let Ok(ttl) = env::var("MATCHD_IDEMPOTENCY_TTL_SECONDS") {
            self.idempotency.ttl_seconds = ttl
                .parse()
                .context("MATCHD_IDEMPOTENCY_TTL_SECONDS must be an integer")?;
        }
        if let Ok(backend) = env::var("MATCHD_IDEMPOTENCY_BACKEND") {
            self.idempotency.backend = match backend.as_str() {
                "in_memory" => DedupBackend::InMemory,
                "external_kv" => DedupBackend::ExternalKv,
                other => bail!("unknown idempotency backend {other:?}"),
            };
        }
        if let Ok(endpoint) = env::var("MATCHD_IDEMPOTENCY_ENDPOINT") {
            self.idempotency.endpoint = Some(endpoint);
        }
        if let Ok(token) = env::var("MATCHD_IDEMPOTENCY_AUTH_TOKEN") {
            self.idempotency.auth_token = Some(token);
        }
        if let Ok(shards) = env::var("MATCHD_SYMBOLS_SHARDS") {
            self.symbols.shards = shards
                .parse()
                .context("MATCHD_SYMBOLS_SHARDS must be an integer")?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.symbols.shards == 0 {
            bail!("symbols.shards must be at least 1");
        }
        if self.idempotency.ttl_seconds == 0 {
            bail!("idempotency.ttl_seconds must be at least 1");
        }
        for (symbol, shard) in &self.symbols.workers {
            if *shard >= self.symbols.shards {
                bail!(
                    "symbols.workers maps {symbol} to shard {shard}, but only {} shards exist",
                    self.symbols.shards
                );
            }
        }
        if self.idempotency.backend == DedupBackend::ExternalKv
            && self.idempotency.endpoint.is_none()
        {
            bail!("idempotency.backend = external_kv requires idempotency.endpoint");
        }
        Ok(())
    }
}
