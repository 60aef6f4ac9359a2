use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::{Duration, Instant};

use crate::{Client, CustomRedisError};

/// In-memory stand-in for [`crate::RedisClient`].
///
/// Values live in a shared map with real expiry (driven by tokio's clock, so paused
/// time in tests advances it). Canned results registered with the `*_ret` builders
/// take precedence over the map for their key. Clones share state, so a test can
/// keep a handle and inspect recorded calls after handing the client away.
#[derive(Clone)]
pub struct MockRedisClient {
    get_ret: HashMap<String, Result<String, CustomRedisError>>,
    set_ret: HashMap<String, Result<(), CustomRedisError>>,
    del_ret: HashMap<String, Result<(), CustomRedisError>>,
    keys_ret: Option<Result<Vec<String>, CustomRedisError>>,
    flush_ret: Option<Result<(), CustomRedisError>>,
    entries: Arc<Mutex<HashMap<String, MockEntry>>>,
    open: Arc<AtomicBool>,
    calls: Arc<Mutex<Vec<MockRedisCall>>>,
}

#[derive(Clone)]
struct MockEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MockEntry {
    fn is_live(&self) -> bool {
        self.expires_at.map_or(true, |at| Instant::now() < at)
    }
}

impl Default for MockRedisClient {
    fn default() -> Self {
        Self {
            get_ret: HashMap::new(),
            set_ret: HashMap::new(),
            del_ret: HashMap::new(),
            keys_ret: None,
            flush_ret: None,
            entries: Arc::new(Mutex::new(HashMap::new())),
            open: Arc::new(AtomicBool::new(true)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

// Poisoning only happens if a test panicked mid-call; the data is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl MockRedisClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose connection never opened.
    pub fn closed() -> Self {
        let client = Self::default();
        client.set_open(false);
        client
    }

    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::Release);
    }

    pub fn get_ret(&mut self, key: &str, ret: Result<String, CustomRedisError>) -> Self {
        self.get_ret.insert(key.to_owned(), ret);
        self.clone()
    }

    pub fn set_ret(&mut self, key: &str, ret: Result<(), CustomRedisError>) -> Self {
        self.set_ret.insert(key.to_owned(), ret);
        self.clone()
    }

    pub fn del_ret(&mut self, key: &str, ret: Result<(), CustomRedisError>) -> Self {
        self.del_ret.insert(key.to_owned(), ret);
        self.clone()
    }

    pub fn keys_ret(&mut self, ret: Result<Vec<String>, CustomRedisError>) -> Self {
        self.keys_ret = Some(ret);
        self.clone()
    }

    pub fn flush_ret(&mut self, ret: Result<(), CustomRedisError>) -> Self {
        self.flush_ret = Some(ret);
        self.clone()
    }

    /// Store a raw payload directly, bypassing call recording.
    pub fn insert_raw(&self, key: &str, value: &str, ttl_seconds: Option<u64>) {
        let expires_at = ttl_seconds.map(|ttl| Instant::now() + Duration::from_secs(ttl));
        lock(&self.entries).insert(
            key.to_owned(),
            MockEntry {
                value: value.to_owned(),
                expires_at,
            },
        );
    }

    /// Whether a live (unexpired) value is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        lock(&self.entries).get(key).is_some_and(MockEntry::is_live)
    }

    /// Remaining time-to-live for `key`, if it is stored with an expiry.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        lock(&self.entries)
            .get(key)
            .filter(|entry| entry.is_live())
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn get_calls(&self) -> Vec<MockRedisCall> {
        lock(&self.calls).clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    fn record(&self, op: &str, key: &str, value: MockRedisValue) -> Result<(), CustomRedisError> {
        if !self.is_open() {
            return Err(CustomRedisError::Unavailable);
        }
        lock(&self.calls).push(MockRedisCall {
            op: op.to_string(),
            key: key.to_string(),
            value,
        });
        Ok(())
    }

    fn live_keys(&self) -> Vec<String> {
        let mut entries = lock(&self.entries);
        entries.retain(|_, entry| entry.is_live());
        entries.keys().cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockRedisValue {
    None,
    StringWithTTL(String, u64),
    VecString(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRedisCall {
    pub op: String,
    pub key: String,
    pub value: MockRedisValue,
}

#[async_trait]
impl Client for MockRedisClient {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    async fn get(&self, key: String) -> Result<String, CustomRedisError> {
        self.record("get", &key, MockRedisValue::None)?;

        if let Some(ret) = self.get_ret.get(&key) {
            return ret.clone();
        }

        lock(&self.entries)
            .get(&key)
            .filter(|entry| entry.is_live())
            .map(|entry| entry.value.clone())
            .ok_or(CustomRedisError::NotFound)
    }

    async fn setex(&self, key: String, value: String, seconds: u64) -> Result<(), CustomRedisError> {
        self.record(
            "setex",
            &key,
            MockRedisValue::StringWithTTL(value.clone(), seconds),
        )?;

        if let Some(ret) = self.set_ret.get(&key) {
            ret.clone()?;
        }

        self.insert_raw(&key, &value, Some(seconds));
        Ok(())
    }

    async fn del(&self, key: String) -> Result<(), CustomRedisError> {
        self.record("del", &key, MockRedisValue::None)?;

        if let Some(ret) = self.del_ret.get(&key) {
            ret.clone()?;
        }

        lock(&self.entries).remove(&key);
        Ok(())
    }

    async fn batch_del(&self, keys: Vec<String>) -> Result<u64, CustomRedisError> {
        self.record("batch_del", "", MockRedisValue::VecString(keys.clone()))?;

        for key in &keys {
            if let Some(ret) = self.del_ret.get(key) {
                ret.clone()?;
            }
        }

        let mut entries = lock(&self.entries);
        let deleted = keys
            .iter()
            .filter_map(|key| entries.remove(key))
            .filter(MockEntry::is_live)
            .count();
        Ok(deleted as u64)
    }

    async fn keys(&self, pattern: String) -> Result<Vec<String>, CustomRedisError> {
        self.record("keys", &pattern, MockRedisValue::None)?;

        if let Some(ret) = &self.keys_ret {
            return ret.clone();
        }

        let mut matched: Vec<String> = self
            .live_keys()
            .into_iter()
            .filter(|key| glob_match(pattern.as_bytes(), key.as_bytes()))
            .collect();
        matched.sort();
        Ok(matched)
    }

    async fn flush_all(&self) -> Result<(), CustomRedisError> {
        self.record("flush_all", "", MockRedisValue::None)?;

        if let Some(ret) = &self.flush_ret {
            ret.clone()?;
        }

        lock(&self.entries).clear();
        Ok(())
    }
}

/// Redis-style glob matching, limited to `*` and `?`.
fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    match (pattern.first(), text.first()) {
        (None, None) => true,
        (Some(b'*'), _) => {
            glob_match(&pattern[1..], text) || (!text.is_empty() && glob_match(pattern, &text[1..]))
        }
        (Some(b'?'), Some(_)) => glob_match(&pattern[1..], &text[1..]),
        (Some(p), Some(t)) if p == t => glob_match(&pattern[1..], &text[1..]),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match(b"*", b"user:1"));
        assert!(glob_match(b"user:*", b"user:42"));
        assert!(!glob_match(b"user:*", b"users:all"));
        assert!(glob_match(b"user?:all", b"users:all"));
        assert!(glob_match(b"*:all", b"users:all"));
        assert!(!glob_match(b"user:?", b"user:12"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_setex_expires_after_ttl() {
        let client = MockRedisClient::new();
        client
            .setex("user:1".to_string(), "{}".to_string(), 10)
            .await
            .unwrap();

        assert_eq!(client.get("user:1".to_string()).await.unwrap(), "{}");

        tokio::time::advance(Duration::from_secs(10)).await;

        assert!(matches!(
            client.get("user:1".to_string()).await,
            Err(CustomRedisError::NotFound)
        ));
        assert!(!client.contains_key("user:1"));
    }

    #[tokio::test]
    async fn test_closed_client_fails_fast_without_recording() {
        let client = MockRedisClient::closed();

        assert!(matches!(
            client.get("user:1".to_string()).await,
            Err(CustomRedisError::Unavailable)
        ));
        assert!(matches!(
            client.keys("*".to_string()).await,
            Err(CustomRedisError::Unavailable)
        ));
        assert!(client.get_calls().is_empty());
    }

    #[tokio::test]
    async fn test_canned_get_overrides_stored_value() {
        let mut client = MockRedisClient::new();
        client.insert_raw("user:1", "stored", None);
        client.get_ret("user:1", Err(CustomRedisError::Timeout));

        assert!(matches!(
            client.get("user:1".to_string()).await,
            Err(CustomRedisError::Timeout)
        ));
    }

    #[tokio::test]
    async fn test_batch_del_counts_only_existing_keys() {
        let client = MockRedisClient::new();
        client.insert_raw("user:1", "{}", None);
        client.insert_raw("users:all", "[]", None);

        let deleted = client
            .batch_del(vec![
                "user:1".to_string(),
                "users:all".to_string(),
                "user:2".to_string(),
            ])
            .await
            .unwrap();

        assert_eq!(deleted, 2);
        assert!(!client.contains_key("user:1"));
        assert!(!client.contains_key("users:all"));
    }

    #[tokio::test]
    async fn test_keys_and_flush_all() {
        let client = MockRedisClient::new();
        client.insert_raw("user:2", "{}", None);
        client.insert_raw("user:1", "{}", None);
        client.insert_raw("users:all", "[]", None);

        let keys = client.keys("user:*".to_string()).await.unwrap();
        assert_eq!(keys, vec!["user:1".to_string(), "user:2".to_string()]);

        client.flush_all().await.unwrap();
        assert!(client.keys("*".to_string()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let client = MockRedisClient::new();
        let handle = client.clone();

        client
            .setex("user:1".to_string(), "{}".to_string(), 60)
            .await
            .unwrap();

        assert!(handle.contains_key("user:1"));
        assert_eq!(handle.get_calls().len(), 1);
        assert_eq!(handle.get_calls()[0].op, "setex");

        handle.set_open(false);
        assert!(!client.is_open());
    }
}
