//! HTTP delivery of reports to the collector.

use crate::generator::{CollectorRequest, ReportGenerator};
use bulkdata_common::ReportFormat;
use bytes::Bytes;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Header carrying the request tag, for correlating requests on the collector side.
pub const REQUEST_TAG_HEADER: &str = "X-Request-Tag";

/// Tag attached to every collector request.
pub const REQUEST_TAG: &str = "CollectorURL";

/// Status a collector answers an accepted report with.
pub const EXPECTED_STATUS: u16 = 200;

/// POST `body` to `url` once and return the response status.
pub async fn send(
    client: &reqwest::Client,
    url: &str,
    headers: &[(&str, &str)],
    body: Bytes,
) -> Result<u16, reqwest::Error> {
    let mut request = client.post(url).body(body);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let response = request.send().await?;
    Ok(response.status().as_u16())
}

/// How one iteration ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    /// The collector answered 200.
    Passed,
    /// The collector answered something else.
    StatusFailure(u16),
    /// No response: connection refused, timeout, reset.
    TransportFailure(String),
    /// The request could not be built.
    GenerationFailure(String),
}

impl Outcome {
    pub fn from_status(status: u16) -> Self {
        if status == EXPECTED_STATUS {
            Outcome::Passed
        } else {
            Outcome::StatusFailure(status)
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }

    /// Response status, when there was a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Outcome::Passed => Some(EXPECTED_STATUS),
            Outcome::StatusFailure(status) => Some(*status),
            _ => None,
        }
    }
}

/// Result of a single iteration.
#[derive(Debug, Clone)]
pub struct RequestResult {
    pub url: String,
    pub serial_number: String,
    pub format: ReportFormat,
    pub outcome: Outcome,
    pub latency_us: u64,
    pub bytes_sent: usize,
    pub timestamp: Instant,
}

/// Posts rendered reports over a shared connection pool.
#[derive(Clone)]
pub struct CollectorClient {
    client: reqwest::Client,
}

impl CollectorClient {
    /// Create a client with the given per-request timeout.
    pub fn new(timeout: Duration, pool_size: usize) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(pool_size)
            .build()?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Post one report. Never retries.
    pub async fn post_report(&self, request: &CollectorRequest) -> RequestResult {
        let start = Instant::now();
        let [content_type, report_format] = request.headers();
        let headers = [content_type, report_format, (REQUEST_TAG_HEADER, REQUEST_TAG)];

        let outcome = match send(&self.client, &request.url, &headers, request.body.clone()).await
        {
            Ok(status) => Outcome::from_status(status),
            Err(e) => Outcome::TransportFailure(e.to_string()),
        };

        match &outcome {
            Outcome::Passed => debug!(url = %request.url, "Report accepted"),
            Outcome::StatusFailure(status) => {
                warn!(url = %request.url, status, "Collector returned unexpected status")
            }
            Outcome::TransportFailure(err) => {
                warn!(url = %request.url, error = %err, "Request failed")
            }
            Outcome::GenerationFailure(_) => {}
        }

        RequestResult {
            url: request.url.clone(),
            serial_number: request.identity.serial_number.clone(),
            format: request.format,
            outcome,
            latency_us: start.elapsed().as_micros() as u64,
            bytes_sent: request.body.len(),
            timestamp: start,
        }
    }
}

/// Build a report for `format` with the current time and post it once.
pub async fn generate_and_send(
    generator: &mut ReportGenerator,
    client: &CollectorClient,
    format: ReportFormat,
) -> RequestResult {
    match generator.next_request_now(format) {
        Ok(request) => client.post_report(&request).await,
        Err(e) => {
            warn!(format = %format, error = %e, "Failed to build report");
            RequestResult {
                url: String::new(),
                serial_number: String::new(),
                format,
                outcome: Outcome::GenerationFailure(e.to_string()),
                latency_us: 0,
                bytes_sent: 0,
                timestamp: Instant::now(),
            }
        }
    }
}
