use async_trait::async_trait;
use std::time::Duration;
use crate::error::Result;
use crate::types::cache_key::CacheKey;

#[cfg(test)]
use mockall::automock;

/// Storage for refreshed data. A zero `ttl` means the entry never expires
/// and is only replaced by the next successful write to the same key.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn add_cache_item(&self, key: CacheKey, value: serde_json::Value, ttl: Duration) -> Result<()>;
    async fn get_cache_item(&self, key: CacheKey) -> Result<Option<serde_json::Value>>;
}
