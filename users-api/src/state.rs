use anyhow::{Context, Result};
use std::{sync::Arc, time::Duration};

use common_cache::{CacheAdmin, CacheAside, Invalidator};
use common_metrics::setup_metrics_recorder;
use common_redis::{Client as RedisClientTrait, RedisClient};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::time::MissedTickBehavior;

use crate::config::Config;
use crate::users::user_service::{UserCacheTtls, UserService};
use crate::users::user_source::{InMemoryUserSource, UserSource};

#[derive(Clone)]
pub struct State {
    pub redis_client: Arc<dyn RedisClientTrait + Send + Sync>,
    pub user_source: Arc<dyn UserSource + Send + Sync>,
    pub source_timeout: Duration,
    pub ttls: UserCacheTtls,
    pub metrics: Option<PrometheusHandle>,
}

impl State {
    /// Connect to redis, seed the user database and start background tasks.
    ///
    /// An unreachable redis is not an error: the service starts without a cache
    /// and the reconnect loop keeps trying.
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let redis_client = Arc::new(
            RedisClient::with_timeouts(
                config.redis_url.clone(),
                Some(config.redis_response_timeout()),
                Some(config.redis_connection_timeout()),
            )
            .await
            .context("Failed to create Redis client")?,
        );
        tokio::spawn(reconnect_loop(
            redis_client.clone(),
            config.redis_reconnect_interval(),
        ));

        let metrics = if config.enable_metrics {
            Some(setup_metrics_recorder().context("Failed to install metrics recorder")?)
        } else {
            None
        };

        let user_source = Arc::new(InMemoryUserSource::seeded(config.source_latency()));
        tracing::info!(latency = ?config.source_latency(), "Seeded simulated user database");

        Ok(Self::new(config, redis_client, user_source, metrics))
    }

    pub fn new(
        config: &Config,
        redis_client: Arc<dyn RedisClientTrait + Send + Sync>,
        user_source: Arc<dyn UserSource + Send + Sync>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        State {
            redis_client,
            user_source,
            source_timeout: config.source_timeout(),
            ttls: UserCacheTtls {
                list_seconds: config.users_list_ttl_seconds,
                user_seconds: config.user_ttl_seconds,
            },
            metrics,
        }
    }

    pub fn user_service(&self) -> UserService {
        UserService::new(
            self.user_source.clone(),
            CacheAside::new(self.redis_client.clone(), self.source_timeout),
            Invalidator::new(self.redis_client.clone()),
            self.ttls,
        )
    }

    pub fn cache_admin(&self) -> CacheAdmin {
        CacheAdmin::new(self.redis_client.clone())
    }
}

async fn reconnect_loop(client: Arc<RedisClient>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if client.is_open() {
            continue;
        }
        match client.reconnect().await {
            Ok(()) => tracing::info!("Redis connection re-established, caching enabled"),
            Err(e) => tracing::debug!(error = %e, "Redis still unreachable"),
        }
    }
}
