//! End-to-end tests for the collector endpoint.

use std::path::Path;
use std::sync::Arc;

use bulkdata_common::{build_payload, ReportFormat};
use collector::forwarding::{ForwardingConfig, MetricsCollectorService};
use collector::service::{CollectorService, MockCollectorService};
use collector::state::AppState;
use test_utils::{example_report, fixed_identity, SAMPLE_CSV_BODY, SAMPLE_JSON_BODY};

struct TestCollector {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for TestCollector {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn spawn_collector(service: impl CollectorService + 'static) -> TestCollector {
    let state = Arc::new(AppState::new(Arc::new(service)));
    let app = collector::router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    TestCollector {
        base_url: format!("http://{}", addr),
        handle,
    }
}

async fn post(base_url: &str, format: Option<&str>, body: &str) -> (u16, String) {
    let mut request = reqwest::Client::new()
        .post(format!("{}/collector?oui=766768&pc=ONU&sn=01AB", base_url))
        .body(body.to_string());
    if let Some(format) = format {
        request = request.header("BBF-Report-Format", format);
    }
    let response = request.send().await.unwrap();
    let status = response.status().as_u16();
    (status, response.text().await.unwrap())
}

#[tokio::test]
async fn test_accepts_parameter_per_row() {
    let collector = spawn_collector(MockCollectorService::new()).await;
    let (status, _) = post(&collector.base_url, Some("ParameterPerRow"), SAMPLE_CSV_BODY).await;
    assert_eq!(status, 200);

    let stats: serde_json::Value = reqwest::get(format!("{}/stats", collector.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["devices"], 1);
    assert_eq!(stats["reports"], 1);
    assert_eq!(stats["parameters"], 4);
    assert_eq!(stats["per_device"][0]["serial_number"], "01AB");
}

#[tokio::test]
async fn test_accepts_name_value_pair() {
    let collector = spawn_collector(MockCollectorService::new()).await;
    let (status, _) = post(&collector.base_url, Some("NameValuePair"), SAMPLE_JSON_BODY).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_rejects_malformed_bodies() {
    let collector = spawn_collector(MockCollectorService::new()).await;

    let (status, text) = post(&collector.base_url, Some("NameValuePair"), "{not json").await;
    assert_eq!(status, 400);
    assert_eq!(text, "Bad Request: Invalid JSON format");

    let bad_timestamp =
        "ReportTimestamp,ParameterName,ParameterValue,ParameterType\nnow,Device.X,1,unsignedLong";
    let (status, text) = post(&collector.base_url, Some("ParameterPerRow"), bad_timestamp).await;
    assert_eq!(status, 400);
    assert_eq!(text, "Bad Request: Invalid timestamp format");

    let bad_type =
        "ReportTimestamp,ParameterName,ParameterValue,ParameterType\n1,Device.X,1,double";
    let (status, text) = post(&collector.base_url, Some("ParameterPerRow"), bad_type).await;
    assert_eq!(status, 400);
    assert_eq!(text, "Bad Request: Invalid parameter type");
}

#[tokio::test]
async fn test_rejects_unsupported_formats() {
    let collector = spawn_collector(MockCollectorService::new()).await;

    let (status, text) = post(&collector.base_url, Some("ObjectHierarchy"), "{}").await;
    assert_eq!(status, 400);
    assert!(text.starts_with("Bad Request: Unsupported report format ObjectHierarchy."));

    let (status, _) = post(&collector.base_url, Some("ParameterPerColumn"), "").await;
    assert_eq!(status, 400);

    let (status, _) = post(&collector.base_url, None, SAMPLE_CSV_BODY).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_backpressure_answers_429() {
    let collector = spawn_collector(MockCollectorService::new().with_max_in_flight(0)).await;
    let (status, text) = post(&collector.base_url, Some("ParameterPerRow"), SAMPLE_CSV_BODY).await;
    assert_eq!(status, 429);
    assert_eq!(text, "Too Many Requests");
}

#[tokio::test]
async fn test_health_and_metrics() {
    let collector = spawn_collector(MockCollectorService::new()).await;
    let health = reqwest::get(format!("{}/health", collector.base_url))
        .await
        .unwrap();
    assert_eq!(health.status().as_u16(), 200);

    // No recorder is installed in tests.
    let metrics = reqwest::get(format!("{}/metrics", collector.base_url))
        .await
        .unwrap();
    assert_eq!(metrics.status().as_u16(), 404);
}

#[tokio::test]
async fn test_collects_generated_reports_per_device() {
    let collector = spawn_collector(MockCollectorService::new()).await;
    let identity = fixed_identity();
    let url = identity.collector_url(&collector.base_url).unwrap();
    let client = reqwest::Client::new();

    for format in [ReportFormat::ParameterPerRow, ReportFormat::NameValuePair] {
        let body = build_payload(format, &example_report()).unwrap();
        let mut request = client.post(&url).body(body.to_vec());
        for (name, value) in format.headers() {
            request = request.header(name, value);
        }
        let response = request.send().await.unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    let stats: serde_json::Value = reqwest::get(format!("{}/stats", collector.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["devices"], 1);
    assert_eq!(stats["reports"], 2);
    assert_eq!(stats["parameters"], 20);
    assert_eq!(stats["per_device"][0]["serial_number"], "400102030405");
    assert_eq!(stats["per_device"][0]["last_report_timestamp"], 1364529149);
}

#[tokio::test]
async fn test_metrics_sink_accepts_generated_reports() {
    let service = MetricsCollectorService::new(&ForwardingConfig::for_example_parameters());
    let collector = spawn_collector(service).await;
    let url = fixed_identity().collector_url(&collector.base_url).unwrap();
    let client = reqwest::Client::new();

    for format in [ReportFormat::ParameterPerRow, ReportFormat::NameValuePair] {
        let body = build_payload(format, &example_report()).unwrap();
        let mut request = client.post(&url).body(body.to_vec());
        for (name, value) in format.headers() {
            request = request.header(name, value);
        }
        let response = request.send().await.unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }
}

#[tokio::test]
async fn test_metrics_sink_rejects_non_numeric_readings() {
    let service = MetricsCollectorService::new(&ForwardingConfig::for_example_parameters());
    let collector = spawn_collector(service).await;

    let body = "ReportTimestamp,ParameterName,ParameterValue,ParameterType\n\
1364529149,Device.DeviceInfo.ProcessStatus.CPUUsage,idle,string";
    let (status, text) = post(&collector.base_url, Some("ParameterPerRow"), body).await;
    assert_eq!(status, 400);
    assert_eq!(text, "Bad Request: Invalid parameter value");

    let body = r#"{"Report":[{"CollectionTime":1,"Device.DeviceInfo.MemoryStatus.Free":null}]}"#;
    let (status, _) = post(&collector.base_url, Some("NameValuePair"), body).await;
    assert_eq!(status, 400);
}

#[test]
fn test_shipped_instrument_config_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/instruments.yaml");
    let config = ForwardingConfig::from_file(&path).unwrap();
    config.validate().unwrap();
    assert!(config
        .instruments
        .iter()
        .any(|i| i.parameter_name == "Device.DeviceInfo.ProcessStatus.CPUUsage"));
}
