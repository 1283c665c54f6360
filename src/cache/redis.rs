//! Redis-backed shared cache, used whenever `REDIS_URL` is configured.

use super::Cache;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

/// A `Cache` implementation backed by a single Redis instance, shared
/// across every gateway process.
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    /// Connect to `redis_url`, establishing a reconnecting connection
    /// manager (mirrors the teacher's `EntityCache::with_config` pattern
    /// of building a pooled client once and cloning the handle).
    pub async fn connect(redis_url: &str) -> crate::error::Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| crate::error::GatewayError::Cache(e.to_string()))?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| crate::error::GatewayError::Cache(e.to_string()))?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> crate::error::Result<Option<String>> {
        let mut conn = self.manager.clone();
        conn.get(key)
            .await
            .map_err(|e| crate::error::GatewayError::Cache(e.to_string()))
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> crate::error::Result<()> {
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(|e| crate::error::GatewayError::Cache(e.to_string()))
    }

    async fn delete(&self, key: &str) -> crate::error::Result<()> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| crate::error::GatewayError::Cache(e.to_string()))
    }

    async fn try_lock(&self, key: &str, ttl: Duration) -> crate::error::Result<bool> {
        let mut conn = self.manager.clone();
        let acquired: bool = redis::cmd("SET")
            .arg(key)
            .arg("locked")
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(|e| crate::error::GatewayError::Cache(e.to_string()))?;
        Ok(acquired)
    }
}
