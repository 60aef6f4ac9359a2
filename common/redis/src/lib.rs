use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use redis::ErrorKind as RedisErrorKind;

#[derive(Error, Debug, Clone)]
pub enum CustomRedisError {
    #[error("Not found in redis")]
    NotFound,
    #[error("Redis connection is not open")]
    Unavailable,
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Timeout error")]
    Timeout,
    #[error(transparent)]
    Redis(#[from] Arc<redis::RedisError>),
}

impl From<redis::RedisError> for CustomRedisError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            CustomRedisError::Timeout
        } else {
            CustomRedisError::Redis(Arc::new(err))
        }
    }
}

impl From<std::string::FromUtf8Error> for CustomRedisError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        CustomRedisError::ParseError(err.to_string())
    }
}

impl CustomRedisError {
    /// Create a Redis error from an ErrorKind (primarily for testing)
    pub fn from_redis_kind(kind: redis::ErrorKind, description: &'static str) -> Self {
        CustomRedisError::Redis(Arc::new(redis::RedisError::from((kind, description))))
    }

    /// Whether this error means the store could not serve the request at all.
    ///
    /// `NotFound` and `ParseError` are answers from a healthy store (absent key,
    /// unreadable payload); everything else degrades callers to the source of truth.
    pub fn is_unavailable(&self) -> bool {
        !matches!(
            self,
            CustomRedisError::NotFound | CustomRedisError::ParseError(_)
        )
    }

    /// Whether the underlying connection should be considered closed after this error.
    ///
    /// Timeouts only fail the current call; I/O errors, refusals and dropped
    /// connections close it until the next successful reconnect.
    pub fn breaks_connection(&self) -> bool {
        match self {
            CustomRedisError::Redis(err) => {
                err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal()
            }
            _ => false,
        }
    }
}

/// Contract over a remote expiring key-value store.
///
/// Every operation checks [`Client::is_open`] first and fails fast with
/// [`CustomRedisError::Unavailable`] when the connection is not open, so callers
/// can always tell "store unavailable" apart from "key absent".
#[async_trait]
pub trait Client {
    fn is_open(&self) -> bool;

    /// Returns `CustomRedisError::NotFound` when the key is absent or expired.
    async fn get(&self, k: String) -> Result<String, CustomRedisError>;
    async fn setex(&self, k: String, v: String, seconds: u64) -> Result<(), CustomRedisError>;
    async fn del(&self, k: String) -> Result<(), CustomRedisError>;
    /// Deletes all given keys in one round trip, returning how many existed.
    async fn batch_del(&self, keys: Vec<String>) -> Result<u64, CustomRedisError>;
    /// Lists keys matching a glob-style pattern (`*`, `?`).
    async fn keys(&self, pattern: String) -> Result<Vec<String>, CustomRedisError>;
    async fn flush_all(&self) -> Result<(), CustomRedisError>;
}

mod client;
mod mock;

pub use client::RedisClient;
pub use mock::{MockRedisCall, MockRedisClient, MockRedisValue};
