use crate::metrics::record_invalidation;
use crate::CacheKey;
use common_redis::{Client as RedisClient, CustomRedisError};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationOutcome {
    /// Keys were removed; the count is how many existed.
    Deleted(u64),
    /// The store was not open, nothing to remove.
    StoreUnavailable,
    /// The store rejected the delete. Stale entries may live until their TTL.
    Failed,
}

/// Outcome of wiping the whole store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    Cleared,
    NotConnected,
}

/// Removes cache entries made stale by writes to the source of truth.
///
/// Invalidation never fails the caller: the write it follows has already been
/// committed, so errors are logged and reported as an outcome instead.
#[derive(Clone)]
pub struct Invalidator {
    store: Arc<dyn RedisClient + Send + Sync>,
}

impl Invalidator {
    pub fn new(store: Arc<dyn RedisClient + Send + Sync>) -> Self {
        Self { store }
    }

    /// Delete every key in `keys` in a single round trip. Duplicates are ignored.
    pub async fn invalidate<I>(&self, keys: I) -> InvalidationOutcome
    where
        I: IntoIterator<Item = CacheKey>,
    {
        let keys: BTreeSet<CacheKey> = keys.into_iter().collect();
        if keys.is_empty() {
            return InvalidationOutcome::Deleted(0);
        }

        let raw: Vec<String> = keys.iter().map(ToString::to_string).collect();
        match self.store.batch_del(raw).await {
            Ok(deleted) => {
                debug!(keys = ?keys, deleted, "Invalidated cache keys");
                record_invalidation("deleted", deleted);
                InvalidationOutcome::Deleted(deleted)
            }
            Err(CustomRedisError::Unavailable) => {
                debug!(keys = ?keys, "Store not open, nothing to invalidate");
                InvalidationOutcome::StoreUnavailable
            }
            Err(e) => {
                error!(keys = ?keys, error = %e, "Failed to invalidate cache keys");
                record_invalidation("failed", keys.len() as u64);
                InvalidationOutcome::Failed
            }
        }
    }

    /// Delete every key matching a glob pattern such as `user:*`.
    pub async fn invalidate_matching(&self, pattern: &str) -> InvalidationOutcome {
        match self.store.keys(pattern.to_string()).await {
            Ok(keys) => self.invalidate(keys.into_iter().map(CacheKey::new)).await,
            Err(CustomRedisError::Unavailable) => InvalidationOutcome::StoreUnavailable,
            Err(e) => {
                error!(pattern, error = %e, "Failed to list keys for invalidation");
                InvalidationOutcome::Failed
            }
        }
    }

    /// Wipe every key in the store.
    ///
    /// # Errors
    /// Store errors other than a closed connection are returned.
    pub async fn clear_all(&self) -> Result<ClearOutcome, CustomRedisError> {
        match self.store.flush_all().await {
            Ok(()) => Ok(ClearOutcome::Cleared),
            Err(CustomRedisError::Unavailable) => Ok(ClearOutcome::NotConnected),
            Err(e) => Err(e),
        }
    }
}
