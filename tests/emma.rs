use serde_json::json;
use tokio_util::sync::CancellationToken;
use ultron_attendant::config::RetryConfig;
use ultron_attendant::config::providers::EmmaConfig;
use ultron_attendant::error::Error;
use ultron_attendant::providers::emma::EmmaAdapter;
use ultron_attendant::providers::{FilterCriteria, ProviderAdapter};
use ultron_attendant::types::compute::{ComputeType, PricingRecord};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retry() -> RetryConfig {
    RetryConfig {
        initial_interval_ms: 10,
        multiplier: 2.0,
        max_interval_ms: 50,
        max_attempts: 3,
    }
}

fn adapter(server: &MockServer) -> EmmaAdapter {
    let config = EmmaConfig {
        base_url: server.uri(),
        client_id: "attendant".to_string(),
        client_secret: "s3cret".to_string(),
        page_size: 500,
    };
    EmmaAdapter::new(reqwest::Client::new(), &config, fast_retry())
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/issue-token"))
        .and(body_partial_json(json!({"clientId": "attendant", "clientSecret": "s3cret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "tok-1",
            "refreshToken": "ref-1",
            "expiresIn": 3600
        })))
        .mount(server)
        .await;
}

fn configs(ids: &[i64]) -> serde_json::Value {
    let content: Vec<_> = ids
        .iter()
        .map(|id| json!({
            "id": id,
            "providerName": "Amazon EC2",
            "locationName": "Frankfurt",
            "vCpu": 2,
            "ramGb": 4,
            "cost": {"unit": "hour", "currency": "EUR", "pricePerUnit": 0.02 * *id as f64}
        }))
        .collect();
    json!({"content": content, "totalElements": ids.len()})
}

#[tokio::test]
async fn durable_configurations_use_the_issued_token() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/vms-configs"))
        .and(query_param("size", "500"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(configs(&[1, 2])))
        .expect(1)
        .mount(&server)
        .await;

    let records = adapter(&server)
        .fetch_costs(&CancellationToken::new(), &FilterCriteria::ComputeType(ComputeType::Durable))
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    let PricingRecord::Configuration(first) = &records[0] else {
        panic!("expected a configuration record");
    };
    assert_eq!(first.identifier, "1");
    assert_eq!(first.compute_type, ComputeType::Durable);
    assert_eq!(first.price_per_unit(), Some(0.02));
}

#[tokio::test]
async fn ephemeral_configurations_come_from_the_spot_listing() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/spots-configs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(configs(&[7])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/vms-configs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(configs(&[1, 2, 3])))
        .expect(0)
        .mount(&server)
        .await;

    let configurations = adapter(&server)
        .fetch_configurations(&CancellationToken::new(), ComputeType::Ephemeral)
        .await
        .unwrap();

    assert_eq!(configurations.len(), 1);
    assert_eq!(configurations[0].identifier, "7");
    assert_eq!(configurations[0].compute_type, ComputeType::Ephemeral);
}

#[tokio::test]
async fn all_configurations_list_durable_before_ephemeral() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/vms-configs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(configs(&[1, 2])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/spots-configs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(configs(&[9])))
        .mount(&server)
        .await;

    let all = adapter(&server)
        .fetch_all_configurations(&CancellationToken::new())
        .await
        .unwrap();

    let ids: Vec<(&str, ComputeType)> = all.iter().map(|c| (c.identifier.as_str(), c.compute_type)).collect();
    assert_eq!(ids, vec![
        ("1", ComputeType::Durable),
        ("2", ComputeType::Durable),
        ("9", ComputeType::Ephemeral),
    ]);
}

#[tokio::test]
async fn token_failures_exhaust_after_three_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/issue-token"))
        .respond_with(ResponseTemplate::new(500).set_body_string("issuer down"))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/vms-configs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(configs(&[1])))
        .expect(0)
        .mount(&server)
        .await;

    let err = adapter(&server)
        .fetch_costs(&CancellationToken::new(), &FilterCriteria::ComputeType(ComputeType::Durable))
        .await
        .unwrap_err();

    let Error::AuthError { attempts, source } = err else {
        panic!("expected an auth error, got {:?}", err);
    };
    assert_eq!(attempts, 3);
    assert!(matches!(*source, Error::UpstreamStatusError { status: 500, .. }));
}

#[tokio::test]
async fn token_recovers_within_the_retry_budget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/issue-token"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/vms-configs"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(configs(&[4])))
        .mount(&server)
        .await;

    let configurations = adapter(&server)
        .fetch_configurations(&CancellationToken::new(), ComputeType::Durable)
        .await
        .unwrap();

    assert_eq!(configurations.len(), 1);
}

#[tokio::test]
async fn rejects_non_compute_type_criteria() {
    let server = MockServer::start().await;

    let err = adapter(&server)
        .fetch_costs(&CancellationToken::new(), &FilterCriteria::OData(String::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidFilterCriteria { provider: "emma", .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}
