use crate::error::{Error, Result};
use crate::interfaces::compute_service::NodeMapper;
use crate::types::compute::ComputeType;
use crate::types::node::{Node, WeightedNode};

pub const COMPUTE_TYPE_LABEL: &str = "ultron.io/compute-type";

const INSTANCE_TYPE_LABELS: [&str; 2] = [
    "node.kubernetes.io/instance-type",
    "beta.kubernetes.io/instance-type",
];
const REGION_LABELS: [&str; 2] = [
    "topology.kubernetes.io/region",
    "failure-domain.beta.kubernetes.io/region",
];
const ZONE_LABELS: [&str; 2] = [
    "topology.kubernetes.io/zone",
    "failure-domain.beta.kubernetes.io/zone",
];

/// Labels cloud providers put on spot or preemptible nodes, with the
/// value that marks them.
const EPHEMERAL_MARKERS: [(&str, &str); 5] = [
    ("eks.amazonaws.com/capacityType", "SPOT"),
    ("karpenter.sh/capacity-type", "spot"),
    ("cloud.google.com/gke-spot", "true"),
    ("cloud.google.com/gke-preemptible", "true"),
    ("kubernetes.azure.com/scalesetpriority", "spot"),
];

/// Builds weighted nodes from well-known node labels and allocatable
/// resources.
#[derive(Debug, Default, Clone)]
pub struct LabelMapper;

impl LabelMapper {
    pub fn new() -> Self {
        LabelMapper
    }

    fn compute_type(node: &Node) -> Result<ComputeType> {
        if let Some(value) = node.labels.get(COMPUTE_TYPE_LABEL) {
            return match value.to_ascii_lowercase().as_str() {
                "durable" => Ok(ComputeType::Durable),
                "ephemeral" => Ok(ComputeType::Ephemeral),
                other => Err(Error::DecodeError(format!(
                    "unknown {} label value {:?}",
                    COMPUTE_TYPE_LABEL, other
                ))),
            };
        }

        let ephemeral = EPHEMERAL_MARKERS
            .iter()
            .any(|(label, marker)| node.labels.get(*label).is_some_and(|v| v.eq_ignore_ascii_case(marker)));

        Ok(if ephemeral { ComputeType::Ephemeral } else { ComputeType::Durable })
    }
}

fn first_label(node: &Node, candidates: &[&str]) -> String {
    candidates
        .iter()
        .find_map(|label| node.labels.get(*label))
        .cloned()
        .unwrap_or_default()
}

impl NodeMapper for LabelMapper {
    fn map_node_to_weighted_node(&self, node: &Node) -> Result<WeightedNode> {
        if node.name.is_empty() {
            return Err(Error::DecodeError("node has no name".to_string()));
        }

        let mut weighted = WeightedNode::new(node.name.clone(), Self::compute_type(node)?);
        weighted.instance_type = first_label(node, &INSTANCE_TYPE_LABELS);
        weighted.region = first_label(node, &REGION_LABELS);
        weighted.zone = first_label(node, &ZONE_LABELS);
        weighted.available_cpu_cores = node.allocatable_cpu_cores;
        weighted.available_memory_gb = node.allocatable_memory_gb;
        weighted.selector = node.labels.clone();

        Ok(weighted)
    }
}
