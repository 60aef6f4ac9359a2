//! Metric names and emitters for cache operations
//!
//! Every counter carries a `namespace` label taken from the cache key prefix
//! (`user`, `users`, ...).

use crate::{CacheKey, CacheSource};
use common_metrics::inc;

pub const CACHE_RESOLUTIONS_COUNTER: &str = "cache_aside_resolutions_total";
pub const CACHE_WRITE_THROUGH_FAILURES_COUNTER: &str = "cache_aside_write_through_failures_total";
pub const CACHE_PRODUCER_ERRORS_COUNTER: &str = "cache_aside_producer_errors_total";
pub const CACHE_INVALIDATIONS_COUNTER: &str = "cache_aside_invalidations_total";

pub(crate) fn record_resolution(key: &CacheKey, source: CacheSource) {
    inc(
        CACHE_RESOLUTIONS_COUNTER,
        &[
            ("namespace".to_string(), key.namespace().to_string()),
            ("source".to_string(), source.to_string()),
            ("provenance".to_string(), source.provenance().to_string()),
        ],
        1,
    );
}

pub(crate) fn record_write_through_failure(key: &CacheKey, reason: &str) {
    inc(
        CACHE_WRITE_THROUGH_FAILURES_COUNTER,
        &[
            ("namespace".to_string(), key.namespace().to_string()),
            ("reason".to_string(), reason.to_string()),
        ],
        1,
    );
}

pub(crate) fn record_producer_error(key: &CacheKey, reason: &str) {
    inc(
        CACHE_PRODUCER_ERRORS_COUNTER,
        &[
            ("namespace".to_string(), key.namespace().to_string()),
            ("reason".to_string(), reason.to_string()),
        ],
        1,
    );
}

pub(crate) fn record_invalidation(outcome: &str, keys: u64) {
    inc(
        CACHE_INVALIDATIONS_COUNTER,
        &[("outcome".to_string(), outcome.to_string())],
        keys,
    );
}
