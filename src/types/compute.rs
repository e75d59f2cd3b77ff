use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComputeType {
    Durable,
    Ephemeral,
}

impl fmt::Display for ComputeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputeType::Durable => f.write_str("durable"),
            ComputeType::Ephemeral => f.write_str("ephemeral"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComputeCost {
    pub unit: String,
    pub currency: String,
    pub price_per_unit: f64,
}

/// A purchasable compute offering, normalized across providers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComputeConfiguration {
    pub identifier: String,
    pub provider: String,
    pub location: String,
    pub data_center: String,
    pub os_type: String,
    pub os_version: String,
    pub cpu_type: String,
    pub vcpu_count: i64,
    pub ram_gb: i64,
    pub volume_gb: i64,
    pub volume_type: String,
    pub compute_type: ComputeType,
    pub cost: Option<ComputeCost>,
}

impl ComputeConfiguration {
    pub fn price_per_unit(&self) -> Option<f64> {
        self.cost.as_ref().map(|c| c.price_per_unit)
    }
}

/// One record produced by a provider adapter. Some sources only publish
/// prices, others publish full configurations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PricingRecord {
    Cost(ComputeCost),
    Configuration(ComputeConfiguration),
}

impl PricingRecord {
    pub fn cost(&self) -> Option<&ComputeCost> {
        match self {
            PricingRecord::Cost(cost) => Some(cost),
            PricingRecord::Configuration(config) => config.cost.as_ref(),
        }
    }

    pub fn into_configuration(self) -> Option<ComputeConfiguration> {
        match self {
            PricingRecord::Configuration(config) => Some(config),
            PricingRecord::Cost(_) => None,
        }
    }
}
