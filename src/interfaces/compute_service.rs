use async_trait::async_trait;
use crate::error::Result;
use crate::types::compute::ComputeConfiguration;
use crate::types::node::{Node, WeightedNode};

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
pub trait NodeMapper: Send + Sync {
    fn map_node_to_weighted_node(&self, node: &Node) -> Result<WeightedNode>;
}

/// Matching and rate lookups for weighted nodes. `None` from a rate lookup
/// means no rate is known for the node.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ComputeService: Send + Sync {
    async fn match_configuration(&self, node: &WeightedNode) -> Result<Option<ComputeConfiguration>>;
    async fn median_price(&self, node: &WeightedNode) -> Result<f64>;
    async fn interruption_rate(&self, node: &WeightedNode) -> Result<Option<f64>>;
    async fn latency_rate(&self, node: &WeightedNode) -> Result<Option<f64>>;
}
