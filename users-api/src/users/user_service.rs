use common_cache::{
    CacheAside, CacheResult, InvalidationOutcome, Invalidator, KeyNamespace, ResolveError,
};
use common_metrics::timing_guard;
use std::sync::Arc;

use crate::users::user_models::{NewUser, UpdateUser, User};
use crate::users::user_source::{UserError, UserSource};

/// `user:<id>` for single users, `users:all` for the list.
pub const USERS: KeyNamespace = KeyNamespace::new("user", "users");

const SOURCE_QUERY_TIMING: &str = "users_source_query_ms";

#[derive(Debug, Clone, Copy)]
pub struct UserCacheTtls {
    pub list_seconds: u64,
    pub user_seconds: u64,
}

/// Reads go through the cache; writes commit to the source and then invalidate.
#[derive(Clone)]
pub struct UserService {
    source: Arc<dyn UserSource + Send + Sync>,
    cache: CacheAside,
    invalidator: Invalidator,
    ttls: UserCacheTtls,
}

impl UserService {
    pub fn new(
        source: Arc<dyn UserSource + Send + Sync>,
        cache: CacheAside,
        invalidator: Invalidator,
        ttls: UserCacheTtls,
    ) -> Self {
        Self {
            source,
            cache,
            invalidator,
            ttls,
        }
    }

    pub async fn list(&self) -> Result<CacheResult<Vec<User>>, ResolveError<UserError>> {
        self.cache
            .resolve(&USERS.all(), self.ttls.list_seconds, move || async move {
                let _timing = timing_guard(SOURCE_QUERY_TIMING, &[]).label("query", "list");
                self.source.list().await
            })
            .await
    }

    /// Unknown ids surface as `UserError::NotFound` and are never cached.
    pub async fn get(&self, id: u64) -> Result<CacheResult<User>, ResolveError<UserError>> {
        self.cache
            .resolve(&USERS.key(id), self.ttls.user_seconds, move || async move {
                let _timing = timing_guard(SOURCE_QUERY_TIMING, &[]).label("query", "get");
                self.source.get(id).await
            })
            .await
    }

    pub async fn create(&self, new_user: NewUser) -> Result<User, UserError> {
        let user = self.source.create(new_user.validate()?).await?;
        tracing::info!(user_id = user.id, "Created user");
        self.invalidate([USERS.all()]).await;
        Ok(user)
    }

    pub async fn update(&self, id: u64, update: UpdateUser) -> Result<User, UserError> {
        let user = self.source.update(id, update).await?;
        tracing::info!(user_id = id, "Updated user");
        self.invalidate(USERS.affected_by_write(id)).await;
        Ok(user)
    }

    pub async fn delete(&self, id: u64) -> Result<User, UserError> {
        let user = self.source.delete(id).await?;
        tracing::info!(user_id = id, "Deleted user");
        self.invalidate(USERS.affected_by_write(id)).await;
        Ok(user)
    }

    async fn invalidate<I>(&self, keys: I)
    where
        I: IntoIterator<Item = common_cache::CacheKey>,
    {
        if let InvalidationOutcome::Deleted(deleted) = self.invalidator.invalidate(keys).await {
            tracing::debug!(deleted, "Cache invalidated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::user_models::Role;
    use crate::users::user_source::InMemoryUserSource;
    use common_cache::{Provenance, DEFAULT_PRODUCER_TIMEOUT};
    use common_redis::MockRedisClient;
    use std::time::Duration;

    fn service(store: &MockRedisClient, source: &InMemoryUserSource) -> UserService {
        let store: Arc<MockRedisClient> = Arc::new(store.clone());
        UserService::new(
            Arc::new(source.clone()),
            CacheAside::new(store.clone(), DEFAULT_PRODUCER_TIMEOUT),
            Invalidator::new(store),
            UserCacheTtls {
                list_seconds: 60,
                user_seconds: 300,
            },
        )
    }

    fn alice() -> NewUser {
        NewUser {
            name: Some("Alice".to_string()),
            email: Some("alice@example.com".to_string()),
            role: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_user_is_cached_for_five_minutes() {
        let store = MockRedisClient::new();
        let source = InMemoryUserSource::seeded(Duration::from_millis(100));
        let service = service(&store, &source);

        let first = service.get(1).await.unwrap();
        assert_eq!(first.value.name, "John Doe");
        assert_eq!(first.provenance(), Provenance::Source);
        assert_eq!(store.ttl("user:1"), Some(Duration::from_secs(300)));

        tokio::time::advance(Duration::from_secs(10)).await;
        let second = service.get(1).await.unwrap();
        assert_eq!(second.provenance(), Provenance::Cache);
        assert_eq!(second.value, first.value);
        assert_eq!(source.query_count(), 1);

        tokio::time::advance(Duration::from_secs(291)).await;
        let third = service.get(1).await.unwrap();
        assert_eq!(third.provenance(), Provenance::Source);
        assert_eq!(source.query_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_cached() {
        let store = MockRedisClient::new();
        let source = InMemoryUserSource::seeded(Duration::ZERO);
        let service = service(&store, &source);

        let result = service.get(999).await;

        assert!(matches!(
            result,
            Err(ResolveError::Source(UserError::NotFound(999)))
        ));
        assert!(!store.contains_key("user:999"));
    }

    #[tokio::test]
    async fn test_create_invalidates_list() {
        let store = MockRedisClient::new();
        let source = InMemoryUserSource::seeded(Duration::ZERO);
        let service = service(&store, &source);

        assert_eq!(service.list().await.unwrap().value.len(), 3);
        assert!(store.contains_key("users:all"));

        let created = service.create(alice()).await.unwrap();
        assert!(!store.contains_key("users:all"));

        let listed = service.list().await.unwrap();
        assert_eq!(listed.provenance(), Provenance::Source);
        assert!(listed.value.contains(&created));
    }

    #[tokio::test]
    async fn test_create_rejects_missing_fields_without_touching_cache() {
        let store = MockRedisClient::new();
        let source = InMemoryUserSource::seeded(Duration::ZERO);
        let service = service(&store, &source);

        let result = service
            .create(NewUser {
                name: Some("Alice".to_string()),
                ..Default::default()
            })
            .await;

        assert_eq!(result, Err(UserError::MissingFields));
        assert!(store.get_calls().is_empty());
        assert_eq!(source.query_count(), 0);
    }

    #[tokio::test]
    async fn test_update_invalidates_user_and_list() {
        let store = MockRedisClient::new();
        let source = InMemoryUserSource::seeded(Duration::ZERO);
        let service = service(&store, &source);

        service.get(2).await.unwrap();
        service.list().await.unwrap();

        service
            .update(
                2,
                UpdateUser {
                    role: Some(Role::Admin),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(!store.contains_key("user:2"));
        assert!(!store.contains_key("users:all"));

        let fresh = service.get(2).await.unwrap();
        assert_eq!(fresh.provenance(), Provenance::Source);
        assert_eq!(fresh.value.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_delete_invalidates_user_and_list() {
        let store = MockRedisClient::new();
        let source = InMemoryUserSource::seeded(Duration::ZERO);
        let service = service(&store, &source);

        service.get(3).await.unwrap();

        service.delete(3).await.unwrap();

        assert!(!store.contains_key("user:3"));
        assert!(matches!(
            service.get(3).await,
            Err(ResolveError::Source(UserError::NotFound(3)))
        ));
    }

    #[tokio::test]
    async fn test_failed_write_does_not_invalidate() {
        let store = MockRedisClient::new();
        let source = InMemoryUserSource::seeded(Duration::ZERO);
        let service = service(&store, &source);

        service.list().await.unwrap();
        store.clear_calls();

        let result = service.update(42, UpdateUser::default()).await;

        assert_eq!(result, Err(UserError::NotFound(42)));
        assert!(store.contains_key("users:all"));
        assert!(store.get_calls().is_empty());
    }

    #[tokio::test]
    async fn test_reads_and_writes_work_without_store() {
        let store = MockRedisClient::closed();
        let source = InMemoryUserSource::seeded(Duration::ZERO);
        let service = service(&store, &source);

        let listed = service.list().await.unwrap();
        assert_eq!(listed.provenance(), Provenance::Source);

        service.create(alice()).await.unwrap();
        assert_eq!(service.list().await.unwrap().value.len(), 4);
    }

    #[tokio::test]
    async fn test_source_outage_is_returned() {
        let store = MockRedisClient::new();
        let source = InMemoryUserSource::seeded(Duration::ZERO);
        let service = service(&store, &source);
        source.set_available(false);

        assert!(matches!(
            service.list().await,
            Err(ResolveError::Source(UserError::Unavailable))
        ));
    }
}
