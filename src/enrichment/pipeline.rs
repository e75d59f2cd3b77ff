use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use crate::error::{EnrichmentStep, Error, Result};
use crate::interfaces::compute_service::{ComputeService, NodeMapper};
use crate::observability::metrics::{NODES_DISCARDED, NODES_ENRICHED};
use crate::types::node::{Node, WeightedNode};

/// Outcome of enriching one inventory batch. Only fully populated nodes
/// appear in `nodes`.
#[derive(Debug, Default)]
pub struct EnrichmentBatch {
    pub nodes: Vec<WeightedNode>,
    pub failures: Vec<Error>,
}

/// Turns inventory nodes into weighted nodes. The pipeline order is fixed:
/// map, match configuration, price, median price, interruption rate,
/// latency rate.
#[derive(Clone)]
pub struct NodeEnricher {
    mapper: Arc<dyn NodeMapper>,
    compute: Arc<dyn ComputeService>,
}

impl NodeEnricher {
    pub fn new(mapper: Arc<dyn NodeMapper>, compute: Arc<dyn ComputeService>) -> Self {
        NodeEnricher { mapper, compute }
    }

    pub async fn enrich(&self, node: &Node) -> Result<WeightedNode> {
        let fail = |step: EnrichmentStep| {
            let name = node.name.clone();
            move |e: Error| step_error(&name, step, e)
        };

        let mut weighted = self
            .mapper
            .map_node_to_weighted_node(node)
            .map_err(fail(EnrichmentStep::Map))?;

        let configuration = self
            .compute
            .match_configuration(&weighted)
            .await
            .map_err(fail(EnrichmentStep::MatchConfiguration))?;

        // No match or no published price leaves the price at zero.
        if let Some(price) = configuration.as_ref().and_then(|c| c.price_per_unit()) {
            weighted.price = price;
        }

        weighted.median_price = self
            .compute
            .median_price(&weighted)
            .await
            .map_err(fail(EnrichmentStep::MedianPrice))?;

        weighted.interruption_rate = self
            .compute
            .interruption_rate(&weighted)
            .await
            .map_err(fail(EnrichmentStep::InterruptionRate))?
            .ok_or_else(|| missing(&node.name, EnrichmentStep::InterruptionRate))?;

        weighted.latency_rate = self
            .compute
            .latency_rate(&weighted)
            .await
            .map_err(fail(EnrichmentStep::LatencyRate))?
            .ok_or_else(|| missing(&node.name, EnrichmentStep::LatencyRate))?;

        Ok(weighted)
    }

    /// Enriches every node in order. A failing node is recorded and skipped;
    /// only cancellation aborts the batch.
    pub async fn enrich_all(&self, cancel: &CancellationToken, nodes: &[Node]) -> Result<EnrichmentBatch> {
        let mut batch = EnrichmentBatch::default();

        for node in nodes {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            match self.enrich(node).await {
                Ok(weighted) => {
                    debug!(node = %node.name, price = weighted.price, "node enriched");
                    NODES_ENRICHED.inc();
                    batch.nodes.push(weighted);
                }
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    if let Error::EnrichmentError { step, .. } = &e {
                        let step = step.to_string();
                        NODES_DISCARDED.with_label_values(&[step.as_str()]).inc();
                    }
                    info!(node = %node.name, error = %e, "node discarded from weighted nodes");
                    batch.failures.push(e);
                }
            }
        }

        Ok(batch)
    }
}

fn step_error(node: &str, step: EnrichmentStep, e: Error) -> Error {
    match e {
        Error::Cancelled => Error::Cancelled,
        other => Error::EnrichmentError {
            node: node.to_string(),
            step,
            reason: other.to_string(),
        },
    }
}

fn missing(node: &str, step: EnrichmentStep) -> Error {
    Error::EnrichmentError {
        node: node.to_string(),
        step,
        reason: "no value available".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::compute_service::{MockComputeService, MockNodeMapper};
    use crate::types::compute::{ComputeConfiguration, ComputeCost, ComputeType};

    fn node(name: &str) -> Node {
        Node {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn configuration(cost: Option<f64>) -> ComputeConfiguration {
        ComputeConfiguration {
            identifier: "cfg".to_string(),
            provider: "emma".to_string(),
            location: String::new(),
            data_center: String::new(),
            os_type: String::new(),
            os_version: String::new(),
            cpu_type: String::new(),
            vcpu_count: 2,
            ram_gb: 4,
            volume_gb: 0,
            volume_type: String::new(),
            compute_type: ComputeType::Durable,
            cost: cost.map(|price_per_unit| ComputeCost {
                unit: "hour".to_string(),
                currency: "EUR".to_string(),
                price_per_unit,
            }),
        }
    }

    fn mapper() -> MockNodeMapper {
        let mut mapper = MockNodeMapper::new();
        mapper
            .expect_map_node_to_weighted_node()
            .returning(|n| Ok(WeightedNode::new(n.name.clone(), ComputeType::Durable)));
        mapper
    }

    #[tokio::test]
    async fn full_pipeline_populates_every_metric() {
        let mut compute = MockComputeService::new();
        compute.expect_match_configuration().returning(|_| Ok(Some(configuration(Some(0.04)))));
        compute.expect_median_price().returning(|n| {
            assert_eq!(n.price, 0.04);
            Ok(0.05)
        });
        compute.expect_interruption_rate().returning(|_| Ok(Some(0.1)));
        compute.expect_latency_rate().returning(|n| {
            assert_eq!(n.interruption_rate, 0.1);
            Ok(Some(0.2))
        });

        let enricher = NodeEnricher::new(Arc::new(mapper()), Arc::new(compute));
        let weighted = enricher.enrich(&node("n1")).await.unwrap();

        assert_eq!(weighted.node_identity, "n1");
        assert_eq!(weighted.price, 0.04);
        assert_eq!(weighted.median_price, 0.05);
        assert_eq!(weighted.interruption_rate, 0.1);
        assert_eq!(weighted.latency_rate, 0.2);
    }

    #[tokio::test]
    async fn missing_configuration_or_cost_keeps_zero_price() {
        for matched in [None, Some(configuration(None))] {
            let mut compute = MockComputeService::new();
            compute.expect_match_configuration().return_once(move |_| Ok(matched));
            compute.expect_median_price().returning(|_| Ok(0.0));
            compute.expect_interruption_rate().returning(|_| Ok(Some(0.0)));
            compute.expect_latency_rate().returning(|_| Ok(Some(0.0)));

            let enricher = NodeEnricher::new(Arc::new(mapper()), Arc::new(compute));
            let weighted = enricher.enrich(&node("n1")).await.unwrap();
            assert_eq!(weighted.price, 0.0);
        }
    }

    #[tokio::test]
    async fn missing_latency_rate_is_a_hard_failure() {
        let mut compute = MockComputeService::new();
        compute.expect_match_configuration().returning(|_| Ok(None));
        compute.expect_median_price().returning(|_| Ok(0.0));
        compute.expect_interruption_rate().returning(|_| Ok(Some(0.0)));
        compute.expect_latency_rate().returning(|_| Ok(None));

        let enricher = NodeEnricher::new(Arc::new(mapper()), Arc::new(compute));
        let err = enricher.enrich(&node("n1")).await.unwrap_err();

        assert!(matches!(err, Error::EnrichmentError { step: EnrichmentStep::LatencyRate, .. }));
    }

    #[tokio::test]
    async fn failed_step_stops_the_pipeline() {
        let mut compute = MockComputeService::new();
        compute.expect_match_configuration().returning(|_| Ok(None));
        compute
            .expect_median_price()
            .returning(|_| Err(Error::DecodeError("bad catalog".to_string())));
        compute.expect_interruption_rate().never();
        compute.expect_latency_rate().never();

        let enricher = NodeEnricher::new(Arc::new(mapper()), Arc::new(compute));
        let err = enricher.enrich(&node("n1")).await.unwrap_err();

        assert!(matches!(err, Error::EnrichmentError { step: EnrichmentStep::MedianPrice, ref node, .. } if node == "n1"));
    }

    #[tokio::test]
    async fn batch_keeps_nodes_that_succeed() {
        let mut compute = MockComputeService::new();
        compute.expect_match_configuration().returning(|_| Ok(Some(configuration(Some(1.0)))));
        compute.expect_median_price().returning(|_| Ok(1.0));
        compute.expect_interruption_rate().returning(|n| {
            if n.node_identity == "n2" {
                Err(Error::TransportError("prediction service down".to_string()))
            } else {
                Ok(Some(0.01))
            }
        });
        compute.expect_latency_rate().returning(|_| Ok(Some(0.02)));

        let enricher = NodeEnricher::new(Arc::new(mapper()), Arc::new(compute));
        let batch = enricher
            .enrich_all(&CancellationToken::new(), &[node("n1"), node("n2")])
            .await
            .unwrap();

        assert_eq!(batch.nodes.len(), 1);
        assert_eq!(batch.nodes[0].node_identity, "n1");
        assert_eq!(batch.failures.len(), 1);
        assert!(matches!(batch.failures[0], Error::EnrichmentError { step: EnrichmentStep::InterruptionRate, .. }));
    }

    #[tokio::test]
    async fn cancelled_batch_stops_before_next_node() {
        let mut mapper = MockNodeMapper::new();
        mapper.expect_map_node_to_weighted_node().never();
        let enricher = NodeEnricher::new(Arc::new(mapper), Arc::new(MockComputeService::new()));

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = enricher.enrich_all(&cancel, &[node("n1")]).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }
}
