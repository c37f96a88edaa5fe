//! Cache Coordinator: memoizes aggregation results keyed by a stable hash of
//! (operation, parameters). Never a source of truth; the Entity Store wins on
//! any ambiguity, so expiry and invalidation only trade staleness for cost.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::errors::AppResult;

/// Time-to-live per operation family.
pub mod ttl {
    use std::time::Duration;

    pub const DASHBOARD: Duration = Duration::from_secs(5 * 60);
    pub const REPORT: Duration = Duration::from_secs(15 * 60);
    pub const FILTER_OPTIONS: Duration = Duration::from_secs(60 * 60);
}

/// Stable key over the operation name and its full parameter structure.
/// Distinct parameter combinations never collide; identical ones always hit.
pub fn cache_key<P: Serialize>(operation: &str, params: &P) -> String {
    let params_json = serde_json::to_string(params).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(operation.as_bytes());
    hasher.update(b":");
    hasher.update(params_json.as_bytes());
    format!("{}:{}", operation, hex::encode(hasher.finalize()))
}

#[derive(Debug, Clone)]
pub enum InvalidationScope {
    All,
    Prefix(String),
}

/// How `invalidate` interprets a scope. `Coarse` treats every scope as a full
/// wipe; `Prefix` is the opt-in targeted variant behind the same call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidationStrategy {
    #[default]
    Coarse,
    Prefix,
}

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;
    async fn put(&self, key: &str, value: Value, ttl: Duration);
    async fn invalidate(&self, scope: InvalidationScope);
}

struct Slot {
    value: Value,
    expires_at: Instant,
}

pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Slot>>,
    strategy: InvalidationStrategy,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::with_strategy(InvalidationStrategy::Coarse)
    }

    pub fn with_strategy(strategy: InvalidationStrategy) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            strategy,
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(slot) if slot.expires_at > Instant::now() => Some(slot.value.clone()),
            Some(_) => {
                // expired; indistinguishable from absence
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn put(&self, key: &str, value: Value, ttl: Duration) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key.to_string(),
            Slot {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    async fn invalidate(&self, scope: InvalidationScope) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match (self.strategy, scope) {
            (InvalidationStrategy::Coarse, _) | (_, InvalidationScope::All) => {
                entries.clear();
            }
            (InvalidationStrategy::Prefix, InvalidationScope::Prefix(prefix)) => {
                entries.retain(|key, _| !key.starts_with(&prefix));
            }
        }
    }
}

#[derive(Clone)]
pub struct CacheCoordinator {
    backend: Arc<dyn CacheBackend>,
}

impl CacheCoordinator {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryCache::new()))
    }

    /// Return the cached value for `key` if present and unexpired, otherwise
    /// run `compute`, store its result with `ttl`, and return it.
    pub async fn get_or_compute<T, F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        if let Some(cached) = self.backend.get(key).await {
            match serde_json::from_value::<T>(cached) {
                Ok(value) => {
                    tracing::debug!(key = %key, "cache hit");
                    return Ok(value);
                }
                Err(err) => {
                    // stored shape no longer matches; recompute
                    tracing::warn!(key = %key, %err, "discarding undecodable cache entry");
                }
            }
        }

        tracing::debug!(key = %key, "cache miss");
        let value = compute().await?;
        match serde_json::to_value(&value) {
            Ok(json) => self.backend.put(key, json, ttl).await,
            Err(err) => tracing::warn!(key = %key, %err, "failed to serialize cache value"),
        }
        Ok(value)
    }

    pub async fn invalidate(&self, scope: InvalidationScope) {
        self.backend.invalidate(scope).await;
    }
}
