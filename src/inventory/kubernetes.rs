use std::collections::BTreeMap;
use async_trait::async_trait;
use reqwest::{Certificate, Client};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use crate::config::cluster::KubernetesConfig;
use crate::error::{Error, Result};
use crate::fetch::http;
use crate::inventory::quantity::{parse_cpu_cores, parse_memory_gb};
use crate::interfaces::node_inventory::NodeInventory;
use crate::types::node::Node;

/// Lists cluster nodes through the Kubernetes REST API.
pub struct KubernetesInventory {
    client: Client,
    api_url: String,
    token_path: Option<String>,
}

impl KubernetesInventory {
    pub fn new(config: &KubernetesConfig, request_timeout: std::time::Duration) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(request_timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs);

        if let Some(path) = config.ca_cert_path.as_deref() {
            match std::fs::read(path) {
                Ok(pem) => {
                    let certificate = Certificate::from_pem(&pem)
                        .map_err(|e| Error::ConfigError(format!("invalid cluster CA {}: {}", path, e)))?;
                    builder = builder.add_root_certificate(certificate);
                }
                Err(e) => debug!(path, error = %e, "cluster CA not readable, using system roots"),
            }
        }

        let client = builder
            .build()
            .map_err(|e| Error::ConfigError(format!("Kubernetes client construction failed: {}", e)))?;

        Ok(Self::with_client(client, &config.api_url, config.token_path.clone()))
    }

    pub fn with_client(client: Client, api_url: &str, token_path: Option<String>) -> Self {
        KubernetesInventory {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token_path,
        }
    }

    /// The service account token is re-read on every listing since the
    /// kubelet rotates it on disk.
    async fn bearer_token(&self) -> Option<String> {
        let path = self.token_path.as_deref()?;
        match tokio::fs::read_to_string(path).await {
            Ok(token) => Some(token.trim().to_string()).filter(|t| !t.is_empty()),
            Err(e) => {
                debug!(path, error = %e, "service account token not readable");
                None
            }
        }
    }
}

#[async_trait]
impl NodeInventory for KubernetesInventory {
    async fn list_nodes(&self, cancel: &CancellationToken) -> Result<Vec<Node>> {
        let mut request = self.client.get(format!("{}/api/v1/nodes", self.api_url));
        if let Some(token) = self.bearer_token().await {
            request = request.bearer_auth(token);
        }

        let list: NodeList = http::get_json(cancel, request).await.map_err(|e| match e {
            Error::Cancelled => Error::Cancelled,
            other => Error::InventoryError(other.to_string()),
        })?;

        let nodes: Vec<Node> = list.items.into_iter().filter_map(KubeNode::into_node).collect();
        info!(count = nodes.len(), "listed cluster nodes");
        Ok(nodes)
    }
}

#[derive(Debug, Deserialize)]
struct NodeList {
    #[serde(default)]
    items: Vec<KubeNode>,
}

#[derive(Debug, Deserialize)]
struct KubeNode {
    metadata: NodeMetadata,
    #[serde(default)]
    status: NodeStatus,
}

#[derive(Debug, Deserialize)]
struct NodeMetadata {
    #[serde(default)]
    name: String,
    #[serde(default)]
    labels: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct NodeStatus {
    #[serde(default)]
    allocatable: BTreeMap<String, String>,
}

impl KubeNode {
    fn into_node(self) -> Option<Node> {
        if self.metadata.name.is_empty() {
            warn!("node without a name ignored");
            return None;
        }

        let resource = |name: &str, parse: fn(&str) -> Option<f64>| {
            self.status.allocatable.get(name).and_then(|v| parse(v)).unwrap_or_default()
        };

        Some(Node {
            allocatable_cpu_cores: resource("cpu", parse_cpu_cores),
            allocatable_memory_gb: resource("memory", parse_memory_gb),
            name: self.metadata.name,
            labels: self.metadata.labels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_list_decodes_consumed_fields() {
        let list: NodeList = serde_json::from_str(r#"{
            "kind": "NodeList",
            "items": [
                {
                    "metadata": {"name": "worker-1", "labels": {"node.kubernetes.io/instance-type": "m5.large"}},
                    "status": {"allocatable": {"cpu": "1930m", "memory": "7629Mi", "pods": "29"}}
                },
                {"metadata": {"labels": {}}}
            ]
        }"#).unwrap();

        let nodes: Vec<Node> = list.items.into_iter().filter_map(KubeNode::into_node).collect();

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "worker-1");
        assert!((nodes[0].allocatable_cpu_cores - 1.93).abs() < 1e-9);
        assert!((nodes[0].allocatable_memory_gb - 7.450).abs() < 0.001);
        assert_eq!(nodes[0].labels["node.kubernetes.io/instance-type"], "m5.large");
    }
}
