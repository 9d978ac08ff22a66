//! Full runs against a stub collector.

use bulkdata_common::SerialNumberMode;
use load_test::{FormatSelection, LoadRunner, TestConfig};
use std::io::Write;
use test_utils::StubCollector;

fn config(base_url: String) -> TestConfig {
    TestConfig {
        name: "runner test".to_string(),
        base_url,
        duration_secs: 10,
        max_iterations: Some(3),
        request_timeout_secs: 5,
        seed: Some(7),
        ..TestConfig::default()
    }
}

#[tokio::test]
async fn test_workers_run_until_iteration_cap() {
    let stub = StubCollector::start(200).await.unwrap();
    let mut config = config(stub.base_url());
    config.concurrency = 2;
    config.format = FormatSelection::Alternate;

    let results = LoadRunner::new(config)
        .unwrap()
        .without_progress()
        .run()
        .await
        .unwrap();

    assert_eq!(results.total_requests, 6);
    assert_eq!(results.passed_requests, 6);
    assert_eq!(results.failed_requests, 0);
    assert_eq!(results.formats.get("ParameterPerRow"), Some(&4));
    assert_eq!(results.formats.get("NameValuePair"), Some(&2));
    assert_eq!(stub.request_count(), 6);
    assert_eq!(results.device_cardinality, Some(256));
}

#[tokio::test]
async fn test_failures_do_not_stop_the_run() {
    let stub = StubCollector::start(500).await.unwrap();

    let results = LoadRunner::new(config(stub.base_url()))
        .unwrap()
        .without_progress()
        .run()
        .await
        .unwrap();

    assert_eq!(results.total_requests, 3);
    assert_eq!(results.status_failures, 3);
    assert_eq!(results.passed_requests, 0);
    assert_eq!(results.status_codes.get(&500), Some(&3));
    // One POST per iteration
    assert_eq!(stub.request_count(), 3);
}

#[tokio::test]
async fn test_unusable_rate_is_rejected_before_sending() {
    let stub = StubCollector::start(200).await.unwrap();
    let mut config = config(stub.base_url());
    config.requests_per_second = Some(1e-300);

    let result = LoadRunner::new(config)
        .unwrap()
        .without_progress()
        .run()
        .await;

    assert!(result.is_err());
    assert_eq!(stub.request_count(), 0);
}

#[tokio::test]
async fn test_slow_rate_sends_once_before_deadline() {
    let stub = StubCollector::start(200).await.unwrap();
    let mut config = config(stub.base_url());
    config.duration_secs = 1;
    config.requests_per_second = Some(0.001);

    let results = LoadRunner::new(config)
        .unwrap()
        .without_progress()
        .run()
        .await
        .unwrap();

    assert_eq!(results.total_requests, 1);
    assert_eq!(results.passed_requests, 1);
}

#[tokio::test]
async fn test_fixed_serial_hits_one_device() {
    let stub = StubCollector::start(200).await.unwrap();
    let mut config = config(stub.base_url());
    config.serial_number = SerialNumberMode::fixed();

    let results = LoadRunner::new(config)
        .unwrap()
        .without_progress()
        .run()
        .await
        .unwrap();

    assert_eq!(results.distinct_devices, 1);
    assert!(stub
        .requests()
        .iter()
        .all(|r| r.query_param("sn") == Some("400102030405")));
}

#[tokio::test]
async fn test_request_log_written() {
    let stub = StubCollector::start(200).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(stub.base_url());
    config.log_requests = true;
    config.results_dir = dir.path().to_string_lossy().to_string();

    LoadRunner::new(config)
        .unwrap()
        .without_progress()
        .run()
        .await
        .unwrap();

    let logs: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .flatten()
        .map(|e| e.path())
        .collect();
    assert_eq!(logs.len(), 1);
    assert!(logs[0]
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("runner_test_"));
    let content = std::fs::read_to_string(&logs[0]).unwrap();
    assert_eq!(content.lines().count(), 3);
    assert!(content.contains("\"kind\":\"passed\""));
}

#[test]
fn test_scenario_file_round_trip() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "name: from_file
duration_secs: 5
format: name_value_pair
serial_number:
  type: bounded_random
  length: 4
  alphabet: \"01\"
"
    )
    .unwrap();

    let config = TestConfig::from_file(file.path()).unwrap();
    config.validate().unwrap();
    assert_eq!(config.name, "from_file");
    assert_eq!(config.format, FormatSelection::NameValuePair);
    assert_eq!(config.serial_number.cardinality(), Some(16));
}
