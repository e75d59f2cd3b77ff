use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::info;
use crate::auth::token_broker::{Credentials, TokenBroker, TokenIssuer};
use crate::config::RetryConfig;
use crate::config::providers::EmmaConfig;
use crate::error::{Error, Result};
use crate::fetch::http;
use crate::providers::{FilterCriteria, Provider, ProviderAdapter};
use crate::types::compute::{ComputeConfiguration, ComputeCost, ComputeType, PricingRecord};

/// Emma multi-cloud API. Requires a client-credentials token for every
/// listing; durable and ephemeral offerings are separate endpoints.
pub struct EmmaAdapter {
    client: Client,
    base_url: String,
    credentials: Credentials,
    broker: TokenBroker<EmmaTokenIssuer>,
    page_size: u32,
}

impl EmmaAdapter {
    pub fn new(client: Client, config: &EmmaConfig, retry: RetryConfig) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let issuer = EmmaTokenIssuer {
            client: client.clone(),
            token_url: format!("{}/v1/issue-token", base_url),
        };

        EmmaAdapter {
            client,
            base_url,
            credentials: Credentials {
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
            },
            broker: TokenBroker::new(issuer, retry),
            page_size: config.page_size,
        }
    }

    pub async fn fetch_configurations(
        &self,
        cancel: &CancellationToken,
        compute_type: ComputeType,
    ) -> Result<Vec<ComputeConfiguration>> {
        let token = self.broker.get_token(cancel, &self.credentials).await?;

        let path = match compute_type {
            ComputeType::Durable => "vms-configs",
            ComputeType::Ephemeral => "spots-configs",
        };

        let request = self
            .client
            .get(format!("{}/v1/{}", self.base_url, path))
            .query(&[("size", self.page_size)])
            .bearer_auth(token);

        let page: EmmaConfigurationsPage = http::get_json(cancel, request).await?;

        info!(%compute_type, count = page.content.len(), "fetched Emma compute configurations");

        Ok(page
            .content
            .into_iter()
            .map(|config| config.into_configuration(compute_type))
            .collect())
    }

    /// Durable configurations followed by ephemeral ones.
    pub async fn fetch_all_configurations(&self, cancel: &CancellationToken) -> Result<Vec<ComputeConfiguration>> {
        let (mut durable, ephemeral) = futures::try_join!(
            self.fetch_configurations(cancel, ComputeType::Durable),
            self.fetch_configurations(cancel, ComputeType::Ephemeral),
        )?;

        durable.extend(ephemeral);
        Ok(durable)
    }
}

#[async_trait]
impl ProviderAdapter for EmmaAdapter {
    fn provider(&self) -> Provider {
        Provider::Emma
    }

    async fn fetch_costs(
        &self,
        cancel: &CancellationToken,
        criteria: &FilterCriteria,
    ) -> Result<Vec<PricingRecord>> {
        let FilterCriteria::ComputeType(compute_type) = criteria else {
            return Err(Error::InvalidFilterCriteria {
                provider: Provider::Emma.name(),
                details: format!("expected a compute type, got {:?}", criteria),
            });
        };

        let configurations = self.fetch_configurations(cancel, *compute_type).await?;
        Ok(configurations.into_iter().map(PricingRecord::Configuration).collect())
    }
}

pub struct EmmaTokenIssuer {
    client: Client,
    token_url: String,
}

#[async_trait]
impl TokenIssuer for EmmaTokenIssuer {
    async fn issue_token(&self, cancel: &CancellationToken, credentials: &Credentials) -> Result<String> {
        let request = self.client.post(&self.token_url).json(credentials);
        let token: EmmaToken = http::get_json(cancel, request).await?;
        Ok(token.access_token)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmmaToken {
    access_token: String,
}

#[derive(Debug, Deserialize)]
pub struct EmmaConfigurationsPage {
    #[serde(default)]
    pub content: Vec<EmmaVmConfiguration>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmmaVmConfiguration {
    pub id: Option<i64>,
    pub provider_id: Option<i64>,
    pub provider_name: Option<String>,
    pub location_id: Option<i64>,
    pub location_name: Option<String>,
    pub data_center_id: Option<String>,
    pub data_center_name: Option<String>,
    pub os_id: Option<i64>,
    pub os_type: Option<String>,
    pub os_version: Option<String>,
    pub cloud_network_types: Vec<String>,
    pub v_cpu_type: Option<String>,
    pub v_cpu: Option<i64>,
    pub ram_gb: Option<i64>,
    pub volume_gb: Option<i64>,
    pub volume_type: Option<String>,
    pub cost: Option<EmmaCost>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmmaCost {
    pub unit: Option<String>,
    pub currency: Option<String>,
    pub price_per_unit: Option<f64>,
}

impl EmmaVmConfiguration {
    pub fn into_configuration(self, compute_type: ComputeType) -> ComputeConfiguration {
        // A cost without a price is no cost at all.
        let cost = self.cost.and_then(|cost| {
            cost.price_per_unit.map(|price_per_unit| ComputeCost {
                unit: cost.unit.unwrap_or_default(),
                currency: cost.currency.unwrap_or_default(),
                price_per_unit,
            })
        });

        ComputeConfiguration {
            identifier: self.id.map(|id| id.to_string()).unwrap_or_default(),
            provider: self.provider_name.unwrap_or_default(),
            location: self.location_name.unwrap_or_default(),
            data_center: self.data_center_name.unwrap_or_default(),
            os_type: self.os_type.unwrap_or_default(),
            os_version: self.os_version.unwrap_or_default(),
            cpu_type: self.v_cpu_type.unwrap_or_default(),
            vcpu_count: self.v_cpu.unwrap_or_default(),
            ram_gb: self.ram_gb.unwrap_or_default(),
            volume_gb: self.volume_gb.unwrap_or_default(),
            volume_type: self.volume_type.unwrap_or_default(),
            compute_type,
            cost,
        }
    }
}
