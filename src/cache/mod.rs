//! A shared, read-through cache keyed by stable identifiers.
//!
//! The cache MUST be a shared store across instances — multiple
//! coordinators run concurrently and balance/credential decisions would
//! otherwise diverge — so a process-local cache is only acceptable in
//! single-instance mode. Cache misses fall through to the database;
//! failures of the cache degrade silently to direct lookups, matching the
//! teacher's `EntityCache` builder shape (`cache::entity_cache`) adapted
//! here from a Postgres entity store to a TTL key-value store.

mod memory;
mod redis;

pub use memory::InMemoryCache;
pub use redis::RedisCache;

use async_trait::async_trait;
use std::time::Duration;

/// TTLs for the well-known cache keys, per the cache entry table.
pub mod ttl {
    use std::time::Duration;

    /// `product:{code}` — 1 hour.
    pub const PRODUCT: Duration = Duration::from_secs(3600);
    /// `products:category:{code}` — 30 minutes.
    pub const PRODUCTS_BY_CATEGORY: Duration = Duration::from_secs(1800);
    /// `data_bundles:{product}:{provider}` — 1 hour.
    pub const DATA_BUNDLES: Duration = Duration::from_secs(3600);
    /// `data_package:{product}:{data}:{provider}` — 1 hour.
    pub const DATA_PACKAGE: Duration = Duration::from_secs(3600);
    /// `product_categories_active` — 2 hours.
    pub const PRODUCT_CATEGORIES_ACTIVE: Duration = Duration::from_secs(7200);
    /// `merchant_auth:{code}` — 5 minutes.
    pub const MERCHANT_AUTH: Duration = Duration::from_secs(300);
}

/// Build the well-known key for a cached entity.
pub mod key {
    /// `product:{code}`
    pub fn product(code: &str) -> String {
        format!("product:{code}")
    }
    /// `products:category:{code}`
    pub fn products_by_category(code: &str) -> String {
        format!("products:category:{code}")
    }
    /// `data_bundles:{product}:{provider}`
    pub fn data_bundles(product: &str, provider: &str) -> String {
        format!("data_bundles:{product}:{provider}")
    }
    /// `data_package:{product}:{data}:{provider}`
    pub fn data_package(product: &str, data: &str, provider: &str) -> String {
        format!("data_package:{product}:{data}:{provider}")
    }
    /// `product_categories_active`
    pub fn product_categories_active() -> &'static str {
        "product_categories_active"
    }
    /// `merchant_auth:{code}`
    pub fn merchant_auth(code: &str) -> String {
        format!("merchant_auth:{code}")
    }
    /// `requery:{transaction_id}`
    pub fn requery_lease(transaction_id: i64) -> String {
        format!("requery:{transaction_id}")
    }
}

/// A shared key-value store with per-key TTLs and a non-blocking lease
/// primitive (used by the requery worker's dedup lock).
///
/// Every method returns a `Result` so implementations can surface transport
/// errors, but callers in this crate NEVER propagate a cache error out of
/// a read-through helper — they log it and fall through to the database,
/// per the component contract in §4.3.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Fetch a raw value, if present and unexpired.
    async fn get(&self, key: &str) -> crate::error::Result<Option<String>>;

    /// Store a value with a TTL, overwriting any existing entry.
    async fn set_with_ttl(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> crate::error::Result<()>;

    /// Remove a key (used on credential rotation / admin invalidation).
    async fn delete(&self, key: &str) -> crate::error::Result<()>;

    /// Attempt to acquire a non-blocking lease: sets `key` to a sentinel
    /// value with the given TTL only if it does not already exist. Returns
    /// `true` if the lease was acquired, `false` if another holder exists.
    async fn try_lock(&self, key: &str, ttl: Duration) -> crate::error::Result<bool>;
}

/// Read-through helper: try the cache, fall through to `miss` on absence
/// *or* on any cache error, logging the latter rather than propagating it.
pub async fn read_through<F, Fut>(
    cache: &dyn Cache,
    key: &str,
    ttl: Duration,
    miss: F,
) -> crate::error::Result<Option<String>>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = crate::error::Result<Option<String>>>,
{
    match cache.get(key).await {
        Ok(Some(value)) => return Ok(Some(value)),
        Ok(None) => {}
        Err(err) => {
            tracing::warn!(key, error = %err, "cache read failed, falling through to source");
        }
    }

    let fetched = miss().await?;
    if let Some(value) = &fetched {
        if let Err(err) = cache.set_with_ttl(key, value.clone(), ttl).await {
            tracing::warn!(key, error = %err, "cache write failed after miss");
        }
    }
    Ok(fetched)
}
