use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::types::compute::ComputeType;

/// Inventory record for a cluster node. Only the fields the enrichment
/// pipeline consumes are kept.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub allocatable_cpu_cores: f64,
    pub allocatable_memory_gb: f64,
}

/// A cluster node annotated with the metrics the scheduler weighs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightedNode {
    pub node_identity: String,
    pub instance_type: String,
    pub region: String,
    pub zone: String,
    pub compute_type: ComputeType,
    pub available_cpu_cores: f64,
    pub available_memory_gb: f64,
    pub selector: BTreeMap<String, String>,
    pub price: f64,
    pub median_price: f64,
    pub interruption_rate: f64,
    pub latency_rate: f64,
}

impl WeightedNode {
    pub fn new(node_identity: impl Into<String>, compute_type: ComputeType) -> Self {
        WeightedNode {
            node_identity: node_identity.into(),
            instance_type: String::new(),
            region: String::new(),
            zone: String::new(),
            compute_type,
            available_cpu_cores: 0.0,
            available_memory_gb: 0.0,
            selector: BTreeMap::new(),
            price: 0.0,
            median_price: 0.0,
            interruption_rate: 0.0,
            latency_rate: 0.0,
        }
    }
}
