use std::collections::{BTreeMap, HashSet};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use crate::error::{Error, Result};
use crate::fetch::http;
use crate::providers::{FilterCriteria, Provider, ProviderAdapter};
use crate::types::compute::{ComputeConfiguration, ComputeCost, ComputeType, PricingRecord};

pub const SERVICE_CODE_EC2: &str = "AmazonEC2";
const GET_PRODUCTS_TARGET: &str = "AWSPriceListService.GetProducts";
const PRICE_CURRENCY: &str = "USD";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PricingFilter {
    #[serde(rename = "Type")]
    pub filter_type: String,
    pub field: String,
    pub value: String,
}

impl PricingFilter {
    pub fn term_match(field: &str, value: &str) -> Self {
        PricingFilter {
            filter_type: "TERM_MATCH".to_string(),
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetProductsRequest {
    pub service_code: String,
    pub filters: Vec<PricingFilter>,
    pub format_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

impl GetProductsRequest {
    /// On-demand Linux pricing for one instance type, shared tenancy and
    /// no pre-installed software.
    pub fn for_instance(instance_type: &str, location: &str) -> Self {
        GetProductsRequest {
            service_code: SERVICE_CODE_EC2.to_string(),
            filters: vec![
                PricingFilter::term_match("instanceType", instance_type),
                PricingFilter::term_match("location", location),
                PricingFilter::term_match("operatingSystem", "Linux"),
                PricingFilter::term_match("preInstalledSw", "NA"),
                PricingFilter::term_match("tenancy", "Shared"),
            ],
            format_version: "aws_v1".to_string(),
            next_token: None,
        }
    }
}

/// One page of the price list. Each entry is itself a JSON document.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetProductsPage {
    #[serde(default)]
    pub price_list: Vec<String>,
    #[serde(default)]
    pub next_token: Option<String>,
}

/// The price list query operation.
#[async_trait]
pub trait PricingApi: Send + Sync {
    async fn get_products(&self, cancel: &CancellationToken, request: &GetProductsRequest) -> Result<GetProductsPage>;
}

/// JSON 1.1 client for the price list endpoint. Requests are sent
/// unsigned, so the endpoint is expected to be a signing proxy or a
/// credential-less mirror.
pub struct HttpPricingApi {
    client: Client,
    endpoint: String,
}

impl HttpPricingApi {
    pub fn new(client: Client, endpoint: &str) -> Self {
        HttpPricingApi {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PricingApi for HttpPricingApi {
    async fn get_products(&self, cancel: &CancellationToken, request: &GetProductsRequest) -> Result<GetProductsPage> {
        let body = serde_json::to_vec(request)?;
        let builder = self
            .client
            .post(format!("{}/", self.endpoint))
            .header("X-Amz-Target", GET_PRODUCTS_TARGET)
            .header(reqwest::header::CONTENT_TYPE, "application/x-amz-json-1.1")
            .body(body);

        http::get_json(cancel, builder).await
    }
}

pub struct AwsAdapter<A> {
    api: A,
}

impl<A: PricingApi> AwsAdapter<A> {
    pub fn new(api: A) -> Self {
        AwsAdapter { api }
    }
}

#[async_trait]
impl<A: PricingApi> ProviderAdapter for AwsAdapter<A> {
    fn provider(&self) -> Provider {
        Provider::Aws
    }

    async fn fetch_costs(
        &self,
        cancel: &CancellationToken,
        criteria: &FilterCriteria,
    ) -> Result<Vec<PricingRecord>> {
        let FilterCriteria::InstanceRegion { instance_type, region } = criteria else {
            return Err(Error::InvalidFilterCriteria {
                provider: Provider::Aws.name(),
                details: format!("expected instance type and region, got {:?}", criteria),
            });
        };

        let mut request = GetProductsRequest::for_instance(instance_type, region);
        let mut records = Vec::new();
        let mut seen_tokens = HashSet::new();

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let page = self.api.get_products(cancel, &request).await?;
            for item in &page.price_list {
                records.extend(decode_price_item(item)?.into_iter().map(PricingRecord::Configuration));
            }

            match page.next_token.filter(|t| !t.is_empty()) {
                Some(token) if !seen_tokens.insert(token.clone()) => {
                    return Err(Error::DecodeError(format!("price list repeated next token {:?}", token)));
                }
                Some(token) => request.next_token = Some(token),
                None => break,
            }
        }

        info!(%instance_type, %region, count = records.len(), "fetched AWS compute prices");
        Ok(records)
    }
}

/// Decodes one price list document into a configuration per on-demand
/// price dimension. The document must be valid JSON; records with missing
/// or mistyped nested keys are skipped.
pub fn decode_price_item(raw: &str) -> Result<Vec<ComputeConfiguration>> {
    let item: PriceItem = serde_json::from_str(raw)?;

    let Some(attributes) = item.product.0.and_then(|p| p.attributes.0) else {
        debug!("price item without product attributes skipped");
        return Ok(Vec::new());
    };
    let Some(instance_type) = attributes.instance_type.clone() else {
        debug!("price item without instance type skipped");
        return Ok(Vec::new());
    };
    let Some(on_demand) = item.terms.0.and_then(|t| t.on_demand.0) else {
        debug!(%instance_type, "price item without on-demand terms skipped");
        return Ok(Vec::new());
    };

    let mut configurations = Vec::new();
    for term in on_demand.into_values().filter_map(|t| t.0) {
        let Some(dimensions) = term.price_dimensions.0 else {
            continue;
        };

        for dimension in dimensions.into_values().filter_map(|d| d.0) {
            let price = dimension
                .price_per_unit
                .0
                .and_then(|prices| prices.get(PRICE_CURRENCY).cloned())
                .and_then(|p| p.parse::<f64>().ok());

            let Some(price_per_unit) = price else {
                debug!(%instance_type, "price dimension without a USD price skipped");
                continue;
            };

            configurations.push(attributes.to_configuration(
                &instance_type,
                ComputeCost {
                    unit: dimension.unit.0.unwrap_or_default(),
                    currency: PRICE_CURRENCY.to_string(),
                    price_per_unit,
                },
            ));
        }
    }

    Ok(configurations)
}

/// Decodes to `None` instead of failing when the value has the wrong shape.
#[derive(Debug)]
struct Lenient<T>(Option<T>);

impl<T> Default for Lenient<T> {
    fn default() -> Self {
        Lenient(None)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Lenient<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Lenient(serde_json::from_value(value).ok()))
    }
}

#[derive(Debug, Deserialize)]
struct PriceItem {
    #[serde(default)]
    product: Lenient<Product>,
    #[serde(default)]
    terms: Lenient<Terms>,
}

#[derive(Debug, Deserialize)]
struct Product {
    #[serde(default)]
    attributes: Lenient<ProductAttributes>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ProductAttributes {
    instance_type: Option<String>,
    location: Option<String>,
    region_code: Option<String>,
    operating_system: Option<String>,
    physical_processor: Option<String>,
    vcpu: Option<String>,
    memory: Option<String>,
    storage: Option<String>,
}

impl ProductAttributes {
    fn to_configuration(&self, instance_type: &str, cost: ComputeCost) -> ComputeConfiguration {
        ComputeConfiguration {
            identifier: instance_type.to_string(),
            provider: Provider::Aws.name().to_string(),
            location: self.location.clone().unwrap_or_default(),
            data_center: self.region_code.clone().unwrap_or_default(),
            os_type: self.operating_system.clone().unwrap_or_default(),
            os_version: String::new(),
            cpu_type: self.physical_processor.clone().unwrap_or_default(),
            vcpu_count: self.vcpu.as_deref().and_then(|v| v.trim().parse().ok()).unwrap_or_default(),
            ram_gb: self.memory.as_deref().and_then(parse_memory_gib).unwrap_or_default(),
            volume_gb: 0,
            volume_type: self.storage.clone().unwrap_or_default(),
            compute_type: ComputeType::Durable,
            cost: Some(cost),
        }
    }
}

/// Parses price list memory strings such as `"16 GiB"` or `"0.5 GiB"`,
/// rounding to whole GiB.
fn parse_memory_gib(raw: &str) -> Option<i64> {
    let number = raw.trim().trim_end_matches("GiB").trim().replace(',', "");
    number.parse::<f64>().ok().map(|gib| gib.round() as i64)
}

#[derive(Debug, Deserialize)]
struct Terms {
    #[serde(rename = "OnDemand", default)]
    on_demand: Lenient<BTreeMap<String, Lenient<Term>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Term {
    #[serde(default)]
    price_dimensions: Lenient<BTreeMap<String, Lenient<PriceDimension>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceDimension {
    #[serde(default)]
    unit: Lenient<String>,
    #[serde(default)]
    price_per_unit: Lenient<BTreeMap<String, String>>,
}
