use chrono::{DateTime, Utc};
use common_cache::{CacheStats, Provenance};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub redis: &'static str,
}

/// A read, tagged with where the data came from.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
    pub source: Provenance,
}

#[derive(Debug, Serialize)]
pub struct WriteResponse<T> {
    pub data: T,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CacheStatsResponse {
    Connected(CacheStats),
    NotConnected { connected: bool, error: &'static str },
}

pub const REDIS_NOT_CONNECTED: &str = "Redis not connected";

impl From<CacheStats> for CacheStatsResponse {
    fn from(stats: CacheStats) -> Self {
        if stats.connected {
            CacheStatsResponse::Connected(stats)
        } else {
            CacheStatsResponse::NotConnected {
                connected: false,
                error: REDIS_NOT_CONNECTED,
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ClearCacheResponse {
    Cleared { message: &'static str },
    NotConnected { error: &'static str },
}
