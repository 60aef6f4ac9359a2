use envconfig::Envconfig;
use std::{net::SocketAddr, time::Duration};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(default = "127.0.0.1:3000")]
    pub address: SocketAddr,

    #[envconfig(default = "redis://localhost:6379/")]
    pub redis_url: String,

    #[envconfig(default = "250")]
    pub redis_response_timeout_ms: u64,

    #[envconfig(default = "2000")]
    pub redis_connection_timeout_ms: u64,

    #[envconfig(default = "5")]
    pub redis_reconnect_interval_secs: u64,

    #[envconfig(default = "2000")]
    pub source_timeout_ms: u64,

    // Artificial latency of the simulated user database
    #[envconfig(default = "100")]
    pub source_latency_ms: u64,

    #[envconfig(default = "60")]
    pub users_list_ttl_seconds: u64,

    #[envconfig(default = "300")]
    pub user_ttl_seconds: u64,

    #[envconfig(default = "false")]
    pub enable_metrics: bool,
}

impl Config {
    pub fn default_for_test() -> Self {
        Config {
            address: SocketAddr::from(([127, 0, 0, 1], 0)),
            redis_url: "redis://localhost:6379/".to_string(),
            redis_response_timeout_ms: 250,
            redis_connection_timeout_ms: 2000,
            redis_reconnect_interval_secs: 5,
            source_timeout_ms: 2000,
            source_latency_ms: 0,
            users_list_ttl_seconds: 60,
            user_ttl_seconds: 300,
            enable_metrics: false,
        }
    }

    /// Every store call and every source call runs under one of these timeouts,
    /// so none of them may be zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timeouts = [
            ("REDIS_RESPONSE_TIMEOUT_MS", self.redis_response_timeout_ms),
            ("REDIS_CONNECTION_TIMEOUT_MS", self.redis_connection_timeout_ms),
            ("SOURCE_TIMEOUT_MS", self.source_timeout_ms),
        ];
        match timeouts.into_iter().find(|(_, ms)| *ms == 0) {
            Some((name, _)) => Err(ConfigError::ZeroTimeout(name)),
            None => Ok(()),
        }
    }

    pub fn redis_response_timeout(&self) -> Duration {
        Duration::from_millis(self.redis_response_timeout_ms)
    }

    pub fn redis_connection_timeout(&self) -> Duration {
        Duration::from_millis(self.redis_connection_timeout_ms)
    }

    pub fn redis_reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.redis_reconnect_interval_secs.max(1))
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }

    pub fn source_latency(&self) -> Duration {
        Duration::from_millis(self.source_latency_ms)
    }
}
