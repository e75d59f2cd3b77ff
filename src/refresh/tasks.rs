use std::sync::Arc;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use crate::enrichment::pipeline::NodeEnricher;
use crate::error::Result;
use crate::interfaces::node_inventory::NodeInventory;
use crate::providers::{FilterCriteria, ProviderAdapter};
use crate::types::cache_key::CacheKey;

#[cfg(test)]
use mockall::automock;

/// A fully fetched value ready to replace one cache key.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshPayload {
    pub value: serde_json::Value,
    pub records: usize,
}

impl RefreshPayload {
    pub fn from_records<T: serde::Serialize>(records: &[T]) -> Result<Self> {
        Ok(RefreshPayload {
            value: serde_json::to_value(records)?,
            records: records.len(),
        })
    }
}

/// One independent unit of work per cycle. A task owns exactly one cache
/// key and either produces its complete value or fails.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RefreshTask: Send + Sync {
    fn key(&self) -> CacheKey;

    /// Keys this task reads from the cache while fetching. A task whose
    /// dependencies are registered but not yet cached runs after them.
    fn depends_on(&self) -> Vec<CacheKey> {
        Vec::new()
    }

    async fn fetch(&self, cancel: &CancellationToken) -> Result<RefreshPayload>;
}

/// Publishes the records of one provider adapter under a fixed criteria.
pub struct ProviderRefresh {
    key: CacheKey,
    adapter: Arc<dyn ProviderAdapter>,
    criteria: FilterCriteria,
}

impl ProviderRefresh {
    pub fn new(key: CacheKey, adapter: Arc<dyn ProviderAdapter>, criteria: FilterCriteria) -> Self {
        ProviderRefresh { key, adapter, criteria }
    }
}

#[async_trait]
impl RefreshTask for ProviderRefresh {
    fn key(&self) -> CacheKey {
        self.key
    }

    async fn fetch(&self, cancel: &CancellationToken) -> Result<RefreshPayload> {
        let records = self.adapter.fetch_costs(cancel, &self.criteria).await?;
        debug!(provider = %self.adapter.provider(), count = records.len(), "provider records fetched");
        RefreshPayload::from_records(&records)
    }
}

/// Lists the cluster and publishes every node that survived enrichment.
pub struct WeightedNodeRefresh {
    inventory: Arc<dyn NodeInventory>,
    enricher: NodeEnricher,
}

impl WeightedNodeRefresh {
    pub fn new(inventory: Arc<dyn NodeInventory>, enricher: NodeEnricher) -> Self {
        WeightedNodeRefresh { inventory, enricher }
    }
}

#[async_trait]
impl RefreshTask for WeightedNodeRefresh {
    fn key(&self) -> CacheKey {
        CacheKey::WeightedNodes
    }

    fn depends_on(&self) -> Vec<CacheKey> {
        vec![CacheKey::DurableConfigurations, CacheKey::EphemeralConfigurations]
    }

    async fn fetch(&self, cancel: &CancellationToken) -> Result<RefreshPayload> {
        let nodes = self.inventory.list_nodes(cancel).await?;
        let mut batch = self.enricher.enrich_all(cancel, &nodes).await?;

        // Publishing an empty list for a non-empty cluster would wipe out
        // the last good value.
        if batch.nodes.is_empty() {
            if let Some(last) = batch.failures.pop() {
                return Err(last);
            }
        }

        if batch.failures.is_empty() {
            info!(listed = nodes.len(), enriched = batch.nodes.len(), "weighted nodes built");
        } else {
            warn!(
                listed = nodes.len(),
                enriched = batch.nodes.len(),
                discarded = batch.failures.len(),
                "weighted nodes built, some nodes discarded"
            );
        }

        RefreshPayload::from_records(&batch.nodes)
    }
}
