use crate::metrics::{record_producer_error, record_resolution, record_write_through_failure};
use crate::{CacheKey, CacheResult, CacheSource};
use common_redis::{Client as RedisClient, CustomRedisError};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_PRODUCER_TIMEOUT: Duration = Duration::from_secs(5);

/// Failure to produce a value. Cache problems never surface here.
#[derive(Error, Debug)]
pub enum ResolveError<E> {
    #[error(transparent)]
    Source(E),
    #[error("Source did not respond within {0:?}")]
    SourceTimeout(Duration),
}

impl<E> ResolveError<E> {
    pub fn into_source(self) -> Option<E> {
        match self {
            ResolveError::Source(e) => Some(e),
            ResolveError::SourceTimeout(_) => None,
        }
    }
}

enum Miss {
    Absent,
    Corrupted,
    Unavailable,
}

impl Miss {
    fn source(&self) -> CacheSource {
        match self {
            Miss::Absent => CacheSource::SourceCacheMiss,
            Miss::Corrupted => CacheSource::SourceCacheCorrupted,
            Miss::Unavailable => CacheSource::SourceStoreUnavailable,
        }
    }
}

/// Cache-aside resolver.
///
/// Values are looked up in the store first; on any kind of miss the producer is
/// invoked exactly once and its value written back with the caller's TTL.
/// Store failures degrade to the producer and are never returned to the caller.
///
/// ```text
/// resolve(key)
///   ├─ store hit, payload parses ─────────────► CacheSource::Cache
///   ├─ key absent ──────────┐
///   ├─ payload unreadable ──┼─► producer() ─► setex(key, ttl) ─► CacheSource::Source*
///   └─ store unavailable ───┘
/// ```
#[derive(Clone)]
pub struct CacheAside {
    store: Arc<dyn RedisClient + Send + Sync>,
    producer_timeout: Duration,
}

impl CacheAside {
    pub fn new(store: Arc<dyn RedisClient + Send + Sync>, producer_timeout: Duration) -> Self {
        Self {
            store,
            producer_timeout,
        }
    }

    /// Resolve `key`, producing and caching the value on a miss.
    ///
    /// A TTL of zero returns the produced value without caching it.
    ///
    /// # Errors
    /// Returns the producer's own error, or [`ResolveError::SourceTimeout`] if the
    /// producer did not finish within the configured timeout.
    pub async fn resolve<V, E, F, Fut>(
        &self,
        key: &CacheKey,
        ttl_seconds: u64,
        producer: F,
    ) -> Result<CacheResult<V>, ResolveError<E>>
    where
        V: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let miss = match self.read::<V>(key).await {
            Ok(value) => {
                debug!(key = %key, "Cache hit");
                record_resolution(key, CacheSource::Cache);
                return Ok(CacheResult::new(value, CacheSource::Cache));
            }
            Err(miss) => miss,
        };

        let value = self.produce(key, producer).await?;
        self.write_through(key, ttl_seconds, &value).await;

        let source = miss.source();
        debug!(key = %key, source = %source, "Resolved from source");
        record_resolution(key, source);
        Ok(CacheResult::new(value, source))
    }

    async fn read<V: DeserializeOwned>(&self, key: &CacheKey) -> Result<V, Miss> {
        let payload = match self.store.get(key.to_string()).await {
            Ok(payload) => payload,
            Err(CustomRedisError::NotFound) => return Err(Miss::Absent),
            Err(CustomRedisError::Unavailable) => {
                debug!(key = %key, "Store not open, reading from source");
                return Err(Miss::Unavailable);
            }
            Err(e) if e.is_unavailable() => {
                warn!(key = %key, error = %e, "Cache read failed, reading from source");
                return Err(Miss::Unavailable);
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cached payload is not valid UTF-8, refreshing from source");
                self.discard(key).await;
                return Err(Miss::Corrupted);
            }
        };

        match serde_json::from_str(&payload) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(key = %key, error = %e, "Cached payload does not decode, refreshing from source");
                self.discard(key).await;
                Err(Miss::Corrupted)
            }
        }
    }

    /// Best-effort removal of an unreadable entry. The write-through that follows
    /// overwrites it anyway, unless the store closes in between.
    async fn discard(&self, key: &CacheKey) {
        if let Err(e) = self.store.del(key.to_string()).await {
            debug!(key = %key, error = %e, "Could not discard unreadable cache entry");
        }
    }

    async fn produce<V, E, F, Fut>(&self, key: &CacheKey, producer: F) -> Result<V, ResolveError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        match tokio::time::timeout(self.producer_timeout, producer()).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                record_producer_error(key, "error");
                Err(ResolveError::Source(e))
            }
            Err(_elapsed) => {
                warn!(key = %key, timeout = ?self.producer_timeout, "Source timed out");
                record_producer_error(key, "timeout");
                Err(ResolveError::SourceTimeout(self.producer_timeout))
            }
        }
    }

    async fn write_through<V: Serialize>(&self, key: &CacheKey, ttl_seconds: u64, value: &V) {
        if ttl_seconds == 0 {
            debug!(key = %key, "Zero TTL, not caching");
            return;
        }

        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize value for cache");
                record_write_through_failure(key, "serialize");
                return;
            }
        };

        match self.store.setex(key.to_string(), payload, ttl_seconds).await {
            Ok(()) => {}
            Err(CustomRedisError::Unavailable) => {
                debug!(key = %key, "Store not open, skipping write-through");
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to write value to cache");
                record_write_through_failure(key, "store");
            }
        }
    }
}
