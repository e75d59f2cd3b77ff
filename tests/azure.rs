use serde_json::json;
use tokio_util::sync::CancellationToken;
use ultron_attendant::providers::azure::AzureAdapter;
use ultron_attendant::providers::{FilterCriteria, ProviderAdapter};
use ultron_attendant::types::compute::PricingRecord;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FILTER: &str = "serviceName eq 'Virtual Machines' and armRegionName eq 'westeurope'";

fn price(sku: &str, unit_price: f64) -> serde_json::Value {
    json!({
        "currencyCode": "USD",
        "unitPrice": unit_price,
        "retailPrice": unit_price,
        "unitOfMeasure": "1 Hour",
        "armRegionName": "westeurope",
        "armSkuName": sku,
        "serviceName": "Virtual Machines"
    })
}

#[tokio::test]
async fn walks_every_page_with_the_filter_applied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/retail/prices"))
        .and(query_param("$skip", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Items": [price("Standard_D4_v3", 0.192)],
            "Count": 1,
            "NextPageLink": null
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/retail/prices"))
        .and(query_param("$filter", FILTER))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Items": [price("Standard_D2_v3", 0.096), price("Standard_B1s", 0.0104)],
            "Count": 2,
            "NextPageLink": format!("{}/api/retail/prices?$skip=100", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = AzureAdapter::new(reqwest::Client::new(), &format!("{}/api/retail/prices", server.uri())).unwrap();
    let records = adapter
        .fetch_costs(&CancellationToken::new(), &FilterCriteria::OData(FILTER.to_string()))
        .await
        .unwrap();

    let prices: Vec<f64> = records.iter().filter_map(PricingRecord::cost).map(|c| c.price_per_unit).collect();
    assert_eq!(prices, vec![0.096, 0.0104, 0.192]);
    assert!(records.iter().all(|r| matches!(r, PricingRecord::Cost(c) if c.currency == "USD" && c.unit == "1 Hour")));
}
