use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, AsyncConnectionConfig, RedisError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::{Client, CustomRedisError};

/// Redis-backed store adapter sharing one multiplexed connection per process.
///
/// The connection is tracked by an "is open" flag. Construction never fails
/// because the server is unreachable: the client starts closed instead, and
/// [`RedisClient::reconnect`] can open it later.
pub struct RedisClient {
    client: redis::Client,
    response_timeout: Option<Duration>,
    connection_timeout: Option<Duration>,
    connection: RwLock<Option<MultiplexedConnection>>,
    open: AtomicBool,
}

impl RedisClient {
    /// Create a new RedisClient and try to open its connection.
    ///
    /// # Arguments
    /// * `addr` - Redis connection string
    /// * `response_timeout` - Timeout for command responses. `None` means no timeout.
    /// * `connection_timeout` - Timeout for establishing connections. `None` means no timeout.
    ///
    /// # Errors
    /// Returns `CustomRedisError::InvalidConfiguration` if the address does not parse
    /// or `Some(Duration::ZERO)` is passed for a timeout. An unreachable server is not
    /// an error; the client is returned closed.
    pub async fn with_timeouts(
        addr: String,
        response_timeout: Option<Duration>,
        connection_timeout: Option<Duration>,
    ) -> Result<RedisClient, CustomRedisError> {
        let client = redis::Client::open(addr)
            .map_err(|e| CustomRedisError::InvalidConfiguration(e.to_string()))?;

        if response_timeout.is_some_and(|t| t.is_zero()) {
            return Err(CustomRedisError::InvalidConfiguration(
                "Redis response timeout cannot be Duration::ZERO - use None for no timeout"
                    .to_string(),
            ));
        }
        if connection_timeout.is_some_and(|t| t.is_zero()) {
            return Err(CustomRedisError::InvalidConfiguration(
                "Redis connection timeout cannot be Duration::ZERO - use None for no timeout"
                    .to_string(),
            ));
        }

        let redis_client = RedisClient {
            client,
            response_timeout,
            connection_timeout,
            connection: RwLock::new(None),
            open: AtomicBool::new(false),
        };

        if let Err(e) = redis_client.reconnect().await {
            warn!(error = %e, "Redis connection could not be opened, caching disabled until reconnect");
        }

        Ok(redis_client)
    }

    /// Open a fresh connection and mark the client open.
    pub async fn reconnect(&self) -> Result<(), CustomRedisError> {
        let mut config = AsyncConnectionConfig::new();
        if let Some(timeout) = self.response_timeout {
            config = config.set_response_timeout(timeout);
        }
        if let Some(timeout) = self.connection_timeout {
            config = config.set_connection_timeout(timeout);
        }

        let connection = self
            .client
            .get_multiplexed_async_connection_with_config(&config)
            .await?;

        *self.connection.write().await = Some(connection);
        self.open.store(true, Ordering::Release);
        info!("Redis connection opened");
        Ok(())
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CustomRedisError> {
        if !self.is_open() {
            return Err(CustomRedisError::Unavailable);
        }
        self.connection
            .read()
            .await
            .clone()
            .ok_or(CustomRedisError::Unavailable)
    }

    /// Convert a command result, closing the connection on transport failures.
    fn observe<T>(&self, result: Result<T, RedisError>) -> Result<T, CustomRedisError> {
        result.map_err(|e| {
            let err = CustomRedisError::from(e);
            if err.breaks_connection() && self.open.swap(false, Ordering::AcqRel) {
                warn!(error = %err, "Redis connection lost, marking store unavailable");
            }
            err
        })
    }
}

#[async_trait]
impl Client for RedisClient {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    async fn get(&self, k: String) -> Result<String, CustomRedisError> {
        let mut conn = self.connection().await?;
        let raw: Option<Vec<u8>> = self.observe(conn.get(k).await)?;

        match raw {
            Some(bytes) => Ok(String::from_utf8(bytes)?),
            None => Err(CustomRedisError::NotFound),
        }
    }

    async fn setex(&self, k: String, v: String, seconds: u64) -> Result<(), CustomRedisError> {
        let mut conn = self.connection().await?;
        self.observe(conn.set_ex::<_, _, ()>(k, v, seconds).await)
    }

    async fn del(&self, k: String) -> Result<(), CustomRedisError> {
        let mut conn = self.connection().await?;
        self.observe(conn.del::<_, ()>(k).await)
    }

    async fn batch_del(&self, keys: Vec<String>) -> Result<u64, CustomRedisError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        self.observe(conn.del::<_, u64>(keys).await)
    }

    async fn keys(&self, pattern: String) -> Result<Vec<String>, CustomRedisError> {
        let mut conn = self.connection().await?;
        self.observe(conn.keys::<_, Vec<String>>(pattern).await)
    }

    async fn flush_all(&self) -> Result<(), CustomRedisError> {
        let mut conn = self.connection().await?;
        self.observe(redis::cmd("FLUSHALL").query_async::<()>(&mut conn).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod redis_client_config {
        use super::*;

        #[tokio::test]
        async fn test_zero_response_timeout_returns_error() {
            let result = RedisClient::with_timeouts(
                "redis://localhost:6379".to_string(),
                Some(Duration::ZERO),
                None,
            )
            .await;

            assert!(matches!(
                result,
                Err(CustomRedisError::InvalidConfiguration(_))
            ));
            if let Err(CustomRedisError::InvalidConfiguration(msg)) = result {
                assert!(msg.contains("response timeout"));
            }
        }

        #[tokio::test]
        async fn test_zero_connection_timeout_returns_error() {
            let result = RedisClient::with_timeouts(
                "redis://localhost:6379".to_string(),
                None,
                Some(Duration::ZERO),
            )
            .await;

            assert!(matches!(
                result,
                Err(CustomRedisError::InvalidConfiguration(_))
            ));
            if let Err(CustomRedisError::InvalidConfiguration(msg)) = result {
                assert!(msg.contains("connection timeout"));
            }
        }

        #[tokio::test]
        async fn test_unparseable_address_returns_error() {
            let result = RedisClient::with_timeouts(
                "not a redis url".to_string(),
                Some(Duration::from_millis(100)),
                Some(Duration::from_millis(200)),
            )
            .await;
            assert!(matches!(
                result,
                Err(CustomRedisError::InvalidConfiguration(_))
            ));
        }
    }

    mod unreachable_store {
        use super::*;

        // Port 1 is reserved and refuses connections on any sane test host.
        async fn closed_client() -> RedisClient {
            RedisClient::with_timeouts(
                "redis://127.0.0.1:1/".to_string(),
                Some(Duration::from_millis(100)),
                Some(Duration::from_millis(200)),
            )
            .await
            .expect("an unreachable server is not a configuration error")
        }

        #[tokio::test]
        async fn test_starts_closed_when_server_unreachable() {
            let client = closed_client().await;
            assert!(!client.is_open());
        }

        #[tokio::test]
        async fn test_operations_fail_fast_with_unavailable() {
            let client = closed_client().await;

            assert!(matches!(
                client.get("user:1".to_string()).await,
                Err(CustomRedisError::Unavailable)
            ));
            assert!(matches!(
                client.setex("user:1".to_string(), "{}".to_string(), 10).await,
                Err(CustomRedisError::Unavailable)
            ));
            assert!(matches!(
                client.del("user:1".to_string()).await,
                Err(CustomRedisError::Unavailable)
            ));
            assert!(matches!(
                client.keys("*".to_string()).await,
                Err(CustomRedisError::Unavailable)
            ));
            assert!(matches!(
                client.flush_all().await,
                Err(CustomRedisError::Unavailable)
            ));
        }

        #[tokio::test]
        async fn test_empty_batch_del_needs_no_connection() {
            let client = closed_client().await;
            assert_eq!(client.batch_del(vec![]).await.unwrap(), 0);
        }

        #[tokio::test]
        async fn test_reconnect_fails_and_stays_closed() {
            let client = closed_client().await;
            assert!(client.reconnect().await.is_err());
            assert!(!client.is_open());
        }
    }
}
