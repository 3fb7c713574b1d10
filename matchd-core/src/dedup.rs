//! Idempotency guard.
//!
//! The inbound transport is at-least-once; the guard keeps a bounded set of
//! recently processed order ids so a redelivered record is absorbed without
//! touching the books. Marks expire after a TTL; replays arriving later
//! than that are out of SLA and may match again.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default mark lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Entry count past which an insert sweeps expired marks first.
const SWEEP_WATERMARK: usize = 100_000;

/// Outcome of consulting the guard for one order id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// First sighting inside the TTL; the caller owns processing it.
    Fresh,
    /// Already processed; the record must be acked without side effects.
    Duplicate,
}

/// GuardError represents failures of the guard backend, not of the order.
/// Both variants are retryable via batch item failure.
#[derive(Debug)]
pub enum GuardError {
    /// The backend did not answer within the configured timeout.
    Timeout,
    /// The backend answered with an error.
    Backend(String),
}

impl fmt::Display for GuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardError::Timeout => write!(f, "idempotency backend timed out"),
            GuardError::Backend(msg) => write!(f, "idempotency backend error: {msg}"),
        }
    }
}

impl std::error::Error for GuardError {}

/// The guard seam. Shared across shard workers, so implementations must be
/// internally thread-safe; `check_and_mark` must be atomic per id.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Atomically test-and-mark one order id.
    async fn check_and_mark(&self, order_id: &str) -> Result<Freshness, GuardError>;

    /// Drop a mark so the broker's redelivery of a failed record is not
    /// swallowed as a duplicate.
    async fn unmark(&self, order_id: &str) -> Result<(), GuardError>;
}

/// In-process guard: order id → mark deadline under a mutex.
///
/// Memory stays bounded two ways: inserts past the watermark sweep expired
/// marks inline, and `cleanup()` runs from a periodic task.
pub struct InMemoryDedup {
    ttl: Duration,
    marks: Mutex<HashMap<String, Instant>>,
}

impl InMemoryDedup {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            marks: Mutex::new(HashMap::new()),
        }
    }

    /// Periodic cleanup of expired marks (call from a background task).
    pub fn cleanup(&self) {
        let mut marks = self.marks.lock();
        let now = Instant::now();
        let before = marks.len();
        marks.retain(|_, deadline| *deadline > now);
        if marks.len() < before {
            debug!(expired = before - marks.len(), "swept idempotency marks");
        }
    }

    pub fn len(&self) -> usize {
        self.marks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.lock().is_empty()
    }
}

impl Default for InMemoryDedup {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[async_trait]
impl DedupStore for InMemoryDedup {
    async fn check_and_mark(&self, order_id: &str) -> Result<Freshness, GuardError> {
        let mut marks = self.marks.lock();
        let now = Instant::now();

        if let Some(deadline) = marks.get(order_id) {
            if *deadline > now {
                return Ok(Freshness::Duplicate);
            }
        }

        if marks.len() >= SWEEP_WATERMARK {
            marks.retain(|_, deadline| *deadline > now);
        }
        marks.insert(order_id.to_string(), now + self.ttl);
        Ok(Freshness::Fresh)
    }

    async fn unmark(&self, order_id: &str) -> Result<(), GuardError> {
        self.marks.lock().remove(order_id);
        Ok(())
    }
}

/// Guard backed by a REST key-value store with `SET NX PX` semantics, for
/// deployments where shard workers run in separate processes.
pub struct ExternalKvDedup {
    client: reqwest::Client,
    endpoint: String,
    auth_token: String,
    ttl: Duration,
    timeout: Duration,
}

impl ExternalKvDedup {
    pub fn new(endpoint: String, auth_token: String, ttl: Duration, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            auth_token,
            ttl,
            timeout,
        }
    }

    /// Startup connectivity probe; failure means the dependency is down.
    pub async fn ping(&self) -> Result<(), GuardError> {
        let url = format!("{}/ping", self.endpoint);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.auth_token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(Self::map_error)?;
        response
            .error_for_status()
            .map_err(|e| GuardError::Backend(e.to_string()))?;
        Ok(())
    }

    fn map_error(err: reqwest::Error) -> GuardError {
        if err.is_timeout() {
            GuardError::Timeout
        } else {
            GuardError::Backend(err.to_string())
        }
    }
}

#[async_trait]
impl DedupStore for ExternalKvDedup {
    async fn check_and_mark(&self, order_id: &str) -> Result<Freshness, GuardError> {
        let url = format!(
            "{}/set/dedup:{}/1/nx/px/{}",
            self.endpoint,
            order_id,
            self.ttl.as_millis()
        );
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.auth_token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(Self::map_error)?;
        let body: serde_json::Value = response
            .error_for_status()
            .map_err(|e| GuardError::Backend(e.to_string()))?
            .json()
            .await
            .map_err(Self::map_error)?;

        // NX set answers null when the key already existed.
        if body.get("result").map_or(false, |r| r.is_null()) {
            Ok(Freshness::Duplicate)
        } else {
            Ok(Freshness::Fresh)
        }
    }

    async fn unmark(&self, order_id: &str) -> Result<(), GuardError> {
        let url = format!("{}/del/dedup:{}", self.endpoint, order_id);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.auth_token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(Self::map_error)?;
        response
            .error_for_status()
            .map_err(|e| GuardError::Backend(e.to_string()))?;
        Ok(())
    }
}
