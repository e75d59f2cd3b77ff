use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical cache keys written by the refresh cycle. Each key is refreshed
/// by exactly one task per cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CacheKey {
    DurableConfigurations,
    EphemeralConfigurations,
    WeightedNodes,
    AzureComputeCosts,
    AwsComputeCosts,
}

impl CacheKey {
    /// Keys refreshed on every deployment. Provider cost keys are only
    /// refreshed when their provider is enabled.
    pub const CORE: [CacheKey; 3] = [
        CacheKey::DurableConfigurations,
        CacheKey::EphemeralConfigurations,
        CacheKey::WeightedNodes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKey::DurableConfigurations => "durable-configs",
            CacheKey::EphemeralConfigurations => "ephemeral-configs",
            CacheKey::WeightedNodes => "weighted-nodes",
            CacheKey::AzureComputeCosts => "azure-compute-costs",
            CacheKey::AwsComputeCosts => "aws-compute-costs",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
