pub mod aws;
pub mod azure;
pub mod emma;
pub mod unsupported;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use crate::error::Result;
use crate::types::compute::{ComputeType, PricingRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Provider {
    Emma,
    Azure,
    Aws,
    Gcp,
    Wisp,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Emma => "emma",
            Provider::Azure => "azure",
            Provider::Aws => "aws",
            Provider::Gcp => "gcp",
            Provider::Wisp => "wisp",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Source-specific selection of the records to fetch.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterCriteria {
    /// AWS: a single instance type in a price list location.
    InstanceRegion { instance_type: String, region: String },
    /// Azure: an OData `$filter` expression, empty for no filter.
    OData(String),
    /// GCP: a billing catalog query scoped to a project.
    Project { project_id: String, query: String },
    /// Emma: durable or ephemeral configurations.
    ComputeType(ComputeType),
}

/// Fetches pricing data from one external source and normalizes it.
/// Adapters hold no mutable state and may be shared across tasks.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    async fn fetch_costs(
        &self,
        cancel: &CancellationToken,
        criteria: &FilterCriteria,
    ) -> Result<Vec<PricingRecord>>;
}
