use std::sync::Arc;
use async_trait::async_trait;
use crate::config::cluster::ComputeRatesConfig;
use crate::error::Result;
use crate::interfaces::cache_store::CacheStore;
use crate::interfaces::compute_service::ComputeService;
use crate::types::cache_key::CacheKey;
use crate::types::compute::{ComputeConfiguration, ComputeType, PricingRecord};
use crate::types::node::WeightedNode;

/// Matches nodes against the configuration lists published by the
/// previous refresh cycle. Rates come from configuration.
pub struct CatalogComputeService {
    cache: Arc<dyn CacheStore>,
    rates: ComputeRatesConfig,
}

impl CatalogComputeService {
    pub fn new(cache: Arc<dyn CacheStore>, rates: ComputeRatesConfig) -> Self {
        CatalogComputeService { cache, rates }
    }

    async fn catalog(&self, compute_type: ComputeType) -> Result<Vec<ComputeConfiguration>> {
        let key = match compute_type {
            ComputeType::Durable => CacheKey::DurableConfigurations,
            ComputeType::Ephemeral => CacheKey::EphemeralConfigurations,
        };

        let Some(value) = self.cache.get_cache_item(key).await? else {
            return Ok(Vec::new());
        };

        let records: Vec<PricingRecord> = serde_json::from_value(value)?;
        Ok(records.into_iter().filter_map(PricingRecord::into_configuration).collect())
    }

    /// Configurations with the node's shape. Allocatable resources sit
    /// below capacity, so they are rounded up.
    async fn fitting(&self, node: &WeightedNode) -> Result<Vec<ComputeConfiguration>> {
        let vcpu = node.available_cpu_cores.ceil() as i64;
        let ram = node.available_memory_gb.ceil() as i64;

        Ok(self
            .catalog(node.compute_type)
            .await?
            .into_iter()
            .filter(|c| c.vcpu_count == vcpu && c.ram_gb == ram)
            .collect())
    }
}

#[async_trait]
impl ComputeService for CatalogComputeService {
    async fn match_configuration(&self, node: &WeightedNode) -> Result<Option<ComputeConfiguration>> {
        let fitting = self.fitting(node).await?;

        if let Some(exact) = fitting.iter().find(|c| !node.instance_type.is_empty() && c.identifier == node.instance_type) {
            return Ok(Some(exact.clone()));
        }

        let cheapest = fitting
            .iter()
            .filter(|c| c.cost.is_some())
            .min_by(|a, b| {
                let (a, b) = (a.price_per_unit().unwrap_or_default(), b.price_per_unit().unwrap_or_default());
                a.total_cmp(&b)
            });

        Ok(cheapest.or(fitting.first()).cloned())
    }

    async fn median_price(&self, node: &WeightedNode) -> Result<f64> {
        let prices: Vec<f64> = self
            .fitting(node)
            .await?
            .iter()
            .filter_map(ComputeConfiguration::price_per_unit)
            .collect();

        Ok(median(prices))
    }

    async fn interruption_rate(&self, node: &WeightedNode) -> Result<Option<f64>> {
        Ok(Some(match node.compute_type {
            ComputeType::Durable => self.rates.durable_interruption_rate,
            ComputeType::Ephemeral => self.rates.ephemeral_interruption_rate,
        }))
    }

    async fn latency_rate(&self, node: &WeightedNode) -> Result<Option<f64>> {
        Ok(self
            .rates
            .latency_rates
            .get(&node.region)
            .copied()
            .or(self.rates.default_latency_rate))
    }
}

fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
