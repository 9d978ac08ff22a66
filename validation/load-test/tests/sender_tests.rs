//! Sending reports against a stub collector.

use bulkdata_common::{ReportFormat, SequenceValues, SerialNumberMode, ValueMode};
use load_test::{generate_and_send, CollectorClient, Outcome, ReportGenerator, TestConfig};
use std::time::Duration;
use test_utils::{
    assert_body_line, refused_base_url, StubCollector, EXAMPLE_CSV_SECOND_LINE, FIXED_TIMESTAMP,
};

fn client() -> CollectorClient {
    CollectorClient::new(Duration::from_secs(5), 1).unwrap()
}

fn generator_for(base_url: String) -> ReportGenerator {
    let config = TestConfig {
        base_url,
        ..TestConfig::default()
    };
    ReportGenerator::for_worker(&config, 0)
}

fn example_config(base_url: String) -> TestConfig {
    TestConfig {
        base_url,
        serial_number: SerialNumberMode::fixed(),
        values: ValueMode::Example,
        ..TestConfig::default()
    }
}

#[tokio::test]
async fn test_stub_200_passes() {
    let stub = StubCollector::start(200).await.unwrap();
    let mut generator = generator_for(stub.base_url());

    let result =
        generate_and_send(&mut generator, &client(), ReportFormat::ParameterPerRow).await;

    assert_eq!(result.outcome, Outcome::Passed);
    assert_eq!(stub.request_count(), 1);
}

#[tokio::test]
async fn test_stub_500_fails_without_retry() {
    let stub = StubCollector::start(500).await.unwrap();
    let mut generator = generator_for(stub.base_url());

    let result = generate_and_send(&mut generator, &client(), ReportFormat::NameValuePair).await;

    assert_eq!(result.outcome, Outcome::StatusFailure(500));
    assert!(!result.outcome.passed());
    assert_eq!(stub.request_count(), 1);
}

#[tokio::test]
async fn test_refused_connection_is_transport_failure() {
    let base_url = refused_base_url().await.unwrap();
    let mut generator = generator_for(base_url);

    let result =
        generate_and_send(&mut generator, &client(), ReportFormat::ParameterPerRow).await;

    assert!(matches!(result.outcome, Outcome::TransportFailure(_)));
}

#[tokio::test]
async fn test_csv_request_shape() {
    let stub = StubCollector::start(200).await.unwrap();
    let mut generator = ReportGenerator::new(
        &example_config(stub.base_url()),
        Box::new(SequenceValues::new(vec![0])),
    );

    let request = generator
        .next_request(ReportFormat::ParameterPerRow, FIXED_TIMESTAMP)
        .unwrap();
    let result = client().post_report(&request).await;
    assert!(result.outcome.passed());
    assert_eq!(result.serial_number, "400102030405");

    let requests = stub.requests();
    let captured = &requests[0];
    assert_eq!(captured.method, "POST");
    assert_eq!(captured.path, "/collector");
    assert_eq!(captured.query_param("oui"), Some("766768"));
    assert_eq!(captured.query_param("pc"), Some("ONU"));
    assert_eq!(captured.query_param("sn"), Some("400102030405"));
    assert_eq!(
        captured.header("content-type"),
        Some("text/csv; charset=UTF-8; header=present")
    );
    assert_eq!(captured.header("bbf-report-format"), Some("ParameterPerRow"));
    assert_eq!(captured.header("x-request-tag"), Some("CollectorURL"));
    assert_body_line!(
        captured.body,
        0,
        "ReportTimestamp,ParameterName,ParameterValue,ParameterType"
    );
    assert_body_line!(captured.body, 1, EXAMPLE_CSV_SECOND_LINE);
}

#[tokio::test]
async fn test_json_request_shape() {
    let stub = StubCollector::start(200).await.unwrap();
    let mut generator = ReportGenerator::new(
        &example_config(stub.base_url()),
        Box::new(SequenceValues::new(vec![0])),
    );

    let request = generator
        .next_request(ReportFormat::NameValuePair, FIXED_TIMESTAMP)
        .unwrap();
    client().post_report(&request).await;

    let requests = stub.requests();
    let captured = &requests[0];
    assert_eq!(
        captured.header("content-type"),
        Some("application/json; charset=UTF-8")
    );
    assert_eq!(captured.header("bbf-report-format"), Some("NameValuePair"));

    let body: serde_json::Value = serde_json::from_slice(&captured.body).unwrap();
    let entry = &body["Report"][0];
    assert_eq!(entry["CollectionTime"], FIXED_TIMESTAMP);
    assert_eq!(entry["Device.MoCA.Interface.1.Stats.BroadPktSent"], 25248);
    assert_eq!(body["Report"].as_array().map(Vec::len), Some(1));
}
