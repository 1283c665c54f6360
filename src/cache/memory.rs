//! Single-instance in-memory fallback cache.
//!
//! Permitted per spec when `REDIS_URL` is unset: "local in-memory fallback
//! permitted in single-instance mode." Never use this in a multi-instance
//! deployment — balance/credential decisions would diverge across
//! processes.

use super::Cache;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry {
    value: String,
    expires_at: Instant,
}

/// A `Mutex`-guarded `HashMap` cache, for single-process deployments only.
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> crate::error::Result<Option<String>> {
        let mut entries = self.entries.lock().expect("in-memory cache mutex poisoned");
        if let Some(entry) = entries.get(key) {
            if entry.expires_at > Instant::now() {
                return Ok(Some(entry.value.clone()));
            }
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> crate::error::Result<()> {
        let mut entries = self.entries.lock().expect("in-memory cache mutex poisoned");
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> crate::error::Result<()> {
        let mut entries = self.entries.lock().expect("in-memory cache mutex poisoned");
        entries.remove(key);
        Ok(())
    }

    async fn try_lock(&self, key: &str, ttl: Duration) -> crate::error::Result<bool> {
        let mut entries = self.entries.lock().expect("in-memory cache mutex poisoned");
        if let Some(entry) = entries.get(key) {
            if entry.expires_at > Instant::now() {
                return Ok(false);
            }
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: "locked".to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_value() {
        let cache = InMemoryCache::new();
        cache
            .set_with_ttl("k", "v".into(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent() {
        let cache = InMemoryCache::new();
        cache
            .set_with_ttl("k", "v".into(), Duration::from_millis(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn try_lock_is_exclusive_until_expiry() {
        let cache = InMemoryCache::new();
        assert!(cache
            .try_lock("requery:1", Duration::from_secs(60))
            .await
            .unwrap());
        assert!(!cache
            .try_lock("requery:1", Duration::from_secs(60))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let cache = InMemoryCache::new();
        cache
            .set_with_ttl("k", "v".into(), Duration::from_secs(60))
            .await
            .unwrap();
        cache.delete("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }
}
