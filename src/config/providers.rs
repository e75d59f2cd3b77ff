use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct EmmaConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub page_size: u32,
}

impl Default for EmmaConfig {
    fn default() -> Self {
        EmmaConfig {
            base_url: "https://api.emma.ms/external".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            page_size: i32::MAX as u32,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct AzureConfig {
    pub enabled: bool,
    pub base_url: String,
    pub filter: String,
}

impl Default for AzureConfig {
    fn default() -> Self {
        AzureConfig {
            enabled: false,
            base_url: "https://prices.azure.com/api/retail/prices".to_string(),
            filter: "serviceName eq 'Virtual Machines' and priceType eq 'Consumption'".to_string(),
        }
    }
}

/// The price list endpoint only exists in a few regions, so it is
/// configured separately from the region being priced.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct AwsConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub instance_type: String,
    pub location: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        AwsConfig {
            enabled: false,
            endpoint: "https://api.pricing.us-east-1.amazonaws.com".to_string(),
            instance_type: "t3.medium".to_string(),
            location: "US East (N. Virginia)".to_string(),
        }
    }
}
