use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use crate::config::loader::AppConfig;
use crate::enrichment::catalog::CatalogComputeService;
use crate::enrichment::label_mapper::LabelMapper;
use crate::enrichment::pipeline::NodeEnricher;
use crate::error::Result;
use crate::fetch::http;
use crate::interfaces::cache_store::CacheStore;
use crate::inventory::kubernetes::KubernetesInventory;
use crate::providers::aws::{AwsAdapter, HttpPricingApi};
use crate::providers::azure::AzureAdapter;
use crate::providers::emma::EmmaAdapter;
use crate::providers::{FilterCriteria, ProviderAdapter};
use crate::refresh::orchestrator::RefreshOrchestrator;
use crate::refresh::tasks::{ProviderRefresh, WeightedNodeRefresh};
use crate::types::cache_key::CacheKey;
use crate::types::compute::ComputeType;

/// Wires every collaborator the orchestrator needs. Failing here is the
/// only fatal startup condition.
pub fn build_orchestrator(
    config: &AppConfig,
    cache: Arc<dyn CacheStore>,
    cancel: CancellationToken,
) -> Result<RefreshOrchestrator> {
    let client = http::build_client(config.refresh.request_timeout())?;
    let mut orchestrator = RefreshOrchestrator::new(cache.clone(), config.refresh_interval(), cancel);

    let emma: Arc<dyn ProviderAdapter> = Arc::new(EmmaAdapter::new(client.clone(), &config.emma, config.retry.clone()));
    orchestrator.register(Arc::new(ProviderRefresh::new(
        CacheKey::DurableConfigurations,
        emma.clone(),
        FilterCriteria::ComputeType(ComputeType::Durable),
    )))?;
    orchestrator.register(Arc::new(ProviderRefresh::new(
        CacheKey::EphemeralConfigurations,
        emma,
        FilterCriteria::ComputeType(ComputeType::Ephemeral),
    )))?;

    let inventory = KubernetesInventory::new(&config.kubernetes, config.refresh.request_timeout())?;
    let enricher = NodeEnricher::new(
        Arc::new(LabelMapper::new()),
        Arc::new(CatalogComputeService::new(cache, config.compute.clone())),
    );
    orchestrator.register(Arc::new(WeightedNodeRefresh::new(Arc::new(inventory), enricher)))?;

    if config.azure.enabled {
        let azure = AzureAdapter::new(client.clone(), &config.azure.base_url)?;
        orchestrator.register(Arc::new(ProviderRefresh::new(
            CacheKey::AzureComputeCosts,
            Arc::new(azure),
            FilterCriteria::OData(config.azure.filter.clone()),
        )))?;
    }

    if config.aws.enabled {
        let aws = AwsAdapter::new(HttpPricingApi::new(client, &config.aws.endpoint));
        orchestrator.register(Arc::new(ProviderRefresh::new(
            CacheKey::AwsComputeCosts,
            Arc::new(aws),
            FilterCriteria::InstanceRegion {
                instance_type: config.aws.instance_type.clone(),
                region: config.aws.location.clone(),
            },
        )))?;
    }

    info!(keys = ?orchestrator.keys(), "refresh tasks registered");
    Ok(orchestrator)
}
