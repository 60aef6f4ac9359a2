use crate::invalidation::{ClearOutcome, Invalidator};
use common_redis::{Client as RedisClient, CustomRedisError};
use serde::Serialize;
use std::sync::Arc;

/// Snapshot of what is currently cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub connected: bool,
    pub total_keys: usize,
    pub keys: Vec<String>,
}

impl CacheStats {
    pub fn not_connected() -> Self {
        Self {
            connected: false,
            total_keys: 0,
            keys: Vec::new(),
        }
    }
}

/// Operator view of the cache: inspect keys and wipe the store.
#[derive(Clone)]
pub struct CacheAdmin {
    store: Arc<dyn RedisClient + Send + Sync>,
    invalidator: Invalidator,
}

impl CacheAdmin {
    pub fn new(store: Arc<dyn RedisClient + Send + Sync>) -> Self {
        let invalidator = Invalidator::new(store.clone());
        Self { store, invalidator }
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_open()
    }

    /// List every key in the store, sorted.
    ///
    /// A closed store is reported through `connected: false`; other store errors
    /// are returned.
    pub async fn stats(&self) -> Result<CacheStats, CustomRedisError> {
        match self.store.keys("*".to_string()).await {
            Ok(mut keys) => {
                keys.sort();
                Ok(CacheStats {
                    connected: true,
                    total_keys: keys.len(),
                    keys,
                })
            }
            Err(CustomRedisError::Unavailable) => Ok(CacheStats::not_connected()),
            Err(e) => Err(e),
        }
    }

    pub async fn clear(&self) -> Result<ClearOutcome, CustomRedisError> {
        self.invalidator.clear_all().await
    }
}
