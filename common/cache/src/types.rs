//! Cache keys, provenance tags and resolution results
//!
//! - [`CacheKey`] / [`KeyNamespace`]: deterministic keys for single resources and collections
//! - [`CacheSource`]: detailed origin of a resolved value (for logs and metrics)
//! - [`Provenance`]: the two-valued `cache` / `source` tag returned to callers
//! - [`CacheResult`]: a resolved value and its source

use serde::Serialize;
use std::fmt;

/// A key in the cache store.
///
/// Build keys through a [`KeyNamespace`] rather than by hand so that single
/// resources and collections can never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part of the key before the first `:`, used as a metrics label.
    pub fn namespace(&self) -> &str {
        self.0.split(':').next().unwrap_or_default()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key layout for one kind of resource.
///
/// Single resources live under `<resource>:<id>` and the whole collection under
/// `<collection>:all`. The two prefixes must differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyNamespace {
    resource: &'static str,
    collection: &'static str,
}

impl KeyNamespace {
    pub const fn new(resource: &'static str, collection: &'static str) -> Self {
        Self {
            resource,
            collection,
        }
    }

    /// Key for a single resource, e.g. `user:42`.
    pub fn key(&self, id: impl fmt::Display) -> CacheKey {
        CacheKey(format!("{}:{}", self.resource, id))
    }

    /// Key for the whole collection, e.g. `users:all`.
    pub fn all(&self) -> CacheKey {
        CacheKey(format!("{}:all", self.collection))
    }

    /// Store pattern matching every single-resource key, e.g. `user:*`.
    pub fn resource_pattern(&self) -> String {
        format!("{}:*", self.resource)
    }

    /// Keys made stale by a write to resource `id`.
    pub fn affected_by_write(&self, id: impl fmt::Display) -> [CacheKey; 2] {
        [self.key(id), self.all()]
    }
}

/// Two-valued provenance tag: did the value come from the cache or the source?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Cache,
    Source,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Cache => write!(f, "cache"),
            Provenance::Source => write!(f, "source"),
        }
    }
}

/// Where a resolved value came from and why.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    /// Value was found in the store
    Cache,
    /// Key was absent - value produced by the source
    SourceCacheMiss,
    /// Stored payload could not be read - value produced by the source
    SourceCacheCorrupted,
    /// Store was unavailable - value produced by the source
    SourceStoreUnavailable,
}

impl CacheSource {
    pub fn provenance(&self) -> Provenance {
        match self {
            CacheSource::Cache => Provenance::Cache,
            CacheSource::SourceCacheMiss
            | CacheSource::SourceCacheCorrupted
            | CacheSource::SourceStoreUnavailable => Provenance::Source,
        }
    }
}

impl fmt::Display for CacheSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheSource::Cache => write!(f, "cache"),
            CacheSource::SourceCacheMiss => write!(f, "source_cache_miss"),
            CacheSource::SourceCacheCorrupted => write!(f, "source_cache_corrupted"),
            CacheSource::SourceStoreUnavailable => write!(f, "source_store_unavailable"),
        }
    }
}

/// A resolved value together with its origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheResult<V> {
    pub value: V,
    pub source: CacheSource,
}

impl<V> CacheResult<V> {
    pub fn new(value: V, source: CacheSource) -> Self {
        Self { value, source }
    }

    pub fn provenance(&self) -> Provenance {
        self.source.provenance()
    }

    pub fn was_cached(&self) -> bool {
        self.source == CacheSource::Cache
    }

    /// Check if there was a cache infrastructure problem
    pub fn had_cache_problem(&self) -> bool {
        matches!(
            self.source,
            CacheSource::SourceCacheCorrupted | CacheSource::SourceStoreUnavailable
        )
    }

    pub fn into_parts(self) -> (V, Provenance) {
        let provenance = self.provenance();
        (self.value, provenance)
    }
}
