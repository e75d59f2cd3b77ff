use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Deserializer};
use tokio_util::sync::CancellationToken;
use tracing::info;
use crate::error::{Error, Result};
use crate::fetch::pagination::{Page, PageWalker};
use crate::providers::{FilterCriteria, Provider, ProviderAdapter};
use crate::types::compute::{ComputeCost, PricingRecord};

/// Azure retail prices API. Items map 1:1 to `ComputeCost` records.
pub struct AzureAdapter {
    walker: PageWalker,
    base_url: Url,
}

impl AzureAdapter {
    pub fn new(client: reqwest::Client, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::ConfigError(format!("invalid Azure prices URL {:?}: {}", base_url, e)))?;

        Ok(AzureAdapter {
            walker: PageWalker::new(client),
            base_url,
        })
    }

    fn first_page_url(&self, filter: &str) -> Url {
        let mut url = self.base_url.clone();
        if !filter.is_empty() {
            url.query_pairs_mut().append_pair("$filter", filter);
        }
        url
    }
}

#[async_trait]
impl ProviderAdapter for AzureAdapter {
    fn provider(&self) -> Provider {
        Provider::Azure
    }

    async fn fetch_costs(
        &self,
        cancel: &CancellationToken,
        criteria: &FilterCriteria,
    ) -> Result<Vec<PricingRecord>> {
        let FilterCriteria::OData(filter) = criteria else {
            return Err(Error::InvalidFilterCriteria {
                provider: Provider::Azure.name(),
                details: format!("expected an OData filter, got {:?}", criteria),
            });
        };

        let prices = self
            .walker
            .fetch_all_pages::<AzurePricesPage>(cancel, self.first_page_url(filter))
            .await?;

        info!(count = prices.len(), "fetched Azure compute prices");

        Ok(prices.into_iter().map(AzureComputePrice::into_record).collect())
    }
}

#[derive(Debug, Deserialize)]
pub struct AzurePricesPage {
    #[serde(rename = "Items", default)]
    pub items: Vec<AzureComputePrice>,
    #[serde(rename = "Count", default)]
    pub count: u64,
    #[serde(rename = "NextPageLink", default)]
    pub next_page_link: Option<String>,
}

impl Page for AzurePricesPage {
    type Item = AzureComputePrice;

    fn into_parts(self) -> (Vec<Self::Item>, Option<String>) {
        (self.items, self.next_page_link)
    }
}

/// Missing or null fields take their zero value so one sparse item does
/// not fail the whole listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureComputePrice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub currency_code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub unit_price: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub unit_of_measure: String,
    #[serde(default)]
    pub retail_price: f64,
    #[serde(default)]
    pub arm_region_name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub sku_name: String,
    #[serde(default)]
    pub arm_sku_name: String,
    #[serde(default)]
    pub service_name: String,
    #[serde(default)]
    pub product_name: String,
}

impl AzureComputePrice {
    fn into_record(self) -> PricingRecord {
        PricingRecord::Cost(ComputeCost {
            unit: self.unit_of_measure,
            currency: self.currency_code,
            price_per_unit: self.unit_price,
        })
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
