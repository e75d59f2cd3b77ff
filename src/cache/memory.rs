use std::time::Duration;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;
use crate::error::{Error, Result};
use crate::interfaces::cache_store::CacheStore;
use crate::types::cache_key::CacheKey;

#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub value: serde_json::Value,
    pub stored_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Process-local cache. Readers never observe a partially written value:
/// each write swaps the whole entry.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: DashMap<CacheKey, CacheEntry>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        InMemoryCache {
            entries: DashMap::new(),
        }
    }

    pub fn entry(&self, key: CacheKey) -> Option<CacheEntry> {
        self.entries.get(&key).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn add_cache_item(&self, key: CacheKey, value: serde_json::Value, ttl: Duration) -> Result<()> {
        let stored_at = Utc::now();
        let expires_at = if ttl.is_zero() {
            None
        } else {
            let ttl = chrono::Duration::from_std(ttl).map_err(|e| Error::CacheError {
                key,
                reason: format!("ttl out of range: {}", e),
            })?;
            Some(stored_at + ttl)
        };

        self.entries.insert(key, CacheEntry { value, stored_at, expires_at });
        debug!(%key, "cache entry replaced");
        Ok(())
    }

    async fn get_cache_item(&self, key: CacheKey) -> Result<Option<serde_json::Value>> {
        let now = Utc::now();
        if let Some(entry) = self.entries.get(&key) {
            if !entry.is_expired(now) {
                return Ok(Some(entry.value.clone()));
            }
        } else {
            return Ok(None);
        }

        self.entries.remove_if(&key, |_, entry| entry.is_expired(now));
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn write_replaces_previous_value() {
        let cache = InMemoryCache::new();
        cache.add_cache_item(CacheKey::WeightedNodes, json!([1]), Duration::ZERO).await.unwrap();
        cache.add_cache_item(CacheKey::WeightedNodes, json!([2, 3]), Duration::ZERO).await.unwrap();

        let value = cache.get_cache_item(CacheKey::WeightedNodes).await.unwrap();
        assert_eq!(value, Some(json!([2, 3])));
        assert_eq!(cache.len(), 1);
        assert!(cache.entry(CacheKey::WeightedNodes).unwrap().expires_at.is_none());
    }

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let cache = InMemoryCache::new();
        assert!(cache.get_cache_item(CacheKey::DurableConfigurations).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_entries_are_evicted_on_read() {
        let cache = InMemoryCache::new();
        cache.add_cache_item(CacheKey::EphemeralConfigurations, json!({}), Duration::from_millis(20)).await.unwrap();
        assert!(cache.get_cache_item(CacheKey::EphemeralConfigurations).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(cache.get_cache_item(CacheKey::EphemeralConfigurations).await.unwrap().is_none());
        assert!(cache.is_empty());
    }
}
