use std::collections::HashMap;
use serde::{Deserialize, Serialize};

pub const IN_CLUSTER_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
pub const IN_CLUSTER_CA_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";
pub const LOCAL_API_URL: &str = "https://kubernetes.docker.internal:6443";

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct KubernetesConfig {
    pub api_url: String,
    pub token_path: Option<String>,
    pub ca_cert_path: Option<String>,
    pub accept_invalid_certs: bool,
}

impl Default for KubernetesConfig {
    fn default() -> Self {
        KubernetesConfig {
            api_url: LOCAL_API_URL.to_string(),
            token_path: Some(IN_CLUSTER_TOKEN_PATH.to_string()),
            ca_cert_path: Some(IN_CLUSTER_CA_PATH.to_string()),
            accept_invalid_certs: false,
        }
    }
}

/// Static rates used until a prediction service provides measured ones.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ComputeRatesConfig {
    pub durable_interruption_rate: f64,
    pub ephemeral_interruption_rate: f64,
    pub default_latency_rate: Option<f64>,
    pub latency_rates: HashMap<String, f64>,
}

impl Default for ComputeRatesConfig {
    fn default() -> Self {
        ComputeRatesConfig {
            durable_interruption_rate: 0.0,
            ephemeral_interruption_rate: 0.05,
            default_latency_rate: Some(0.0),
            latency_rates: HashMap::new(),
        }
    }
}
