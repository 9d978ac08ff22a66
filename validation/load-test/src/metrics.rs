//! Metrics collection and statistics.

use crate::sender::{Outcome, RequestResult};
use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

/// Collects metrics during load test execution.
pub struct MetricsCollector {
    histogram: Histogram<u64>,
    requests_total: u64,
    requests_passed: u64,
    status_failures: u64,
    transport_failures: u64,
    generation_failures: u64,
    bytes_sent: u64,
    status_codes: BTreeMap<u16, u64>,
    formats: BTreeMap<String, u64>,
    serial_numbers: HashSet<String>,
    first_request_time: Option<Instant>,
    last_request_time: Option<Instant>,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self {
            histogram: Histogram::new(3).expect("Failed to create histogram"),
            requests_total: 0,
            requests_passed: 0,
            status_failures: 0,
            transport_failures: 0,
            generation_failures: 0,
            bytes_sent: 0,
            status_codes: BTreeMap::new(),
            formats: BTreeMap::new(),
            serial_numbers: HashSet::new(),
            first_request_time: None,
            last_request_time: None,
        }
    }

    /// Record the result of one iteration.
    pub fn record(&mut self, result: &RequestResult) {
        self.requests_total += 1;
        *self
            .formats
            .entry(result.format.header_value().to_string())
            .or_insert(0) += 1;

        if let Some(status) = result.outcome.status() {
            *self.status_codes.entry(status).or_insert(0) += 1;
        }

        match &result.outcome {
            Outcome::Passed => self.requests_passed += 1,
            Outcome::StatusFailure(_) => self.status_failures += 1,
            Outcome::TransportFailure(_) => self.transport_failures += 1,
            Outcome::GenerationFailure(_) => {
                self.generation_failures += 1;
                return;
            }
        }

        self.histogram.record(result.latency_us).ok();
        self.bytes_sent += result.bytes_sent as u64;
        if !result.serial_number.is_empty() {
            self.serial_numbers.insert(result.serial_number.clone());
        }

        let end = result.timestamp + std::time::Duration::from_micros(result.latency_us);
        if self.first_request_time.map_or(true, |t| result.timestamp < t) {
            self.first_request_time = Some(result.timestamp);
        }
        if self.last_request_time.map_or(true, |t| end > t) {
            self.last_request_time = Some(end);
        }
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total
    }

    /// Generate final test results.
    pub fn results(
        &self,
        scenario_name: String,
        format: String,
        concurrency: u32,
        device_cardinality: Option<u64>,
    ) -> TestResults {
        let duration = self
            .last_request_time
            .and_then(|last| self.first_request_time.map(|first| last.duration_since(first)))
            .unwrap_or_default();

        let duration_secs = duration.as_secs_f64();
        let rps = if duration_secs > 0.0 {
            self.requests_total as f64 / duration_secs
        } else {
            0.0
        };

        let pass_rate = if self.requests_total > 0 {
            (self.requests_passed as f64 / self.requests_total as f64) * 100.0
        } else {
            0.0
        };

        let ms = |us: u64| us as f64 / 1000.0;

        TestResults {
            timestamp: chrono::Utc::now().to_rfc3339(),
            scenario_name,
            format,
            duration_secs,
            total_requests: self.requests_total,
            passed_requests: self.requests_passed,
            failed_requests: self.requests_total - self.requests_passed,
            status_failures: self.status_failures,
            transport_failures: self.transport_failures,
            generation_failures: self.generation_failures,
            pass_rate,
            requests_per_second: rps,
            latency_p50: ms(self.histogram.value_at_percentile(50.0)),
            latency_p90: ms(self.histogram.value_at_percentile(90.0)),
            latency_p95: ms(self.histogram.value_at_percentile(95.0)),
            latency_p99: ms(self.histogram.value_at_percentile(99.0)),
            latency_min: ms(self.histogram.min()),
            latency_max: ms(self.histogram.max()),
            latency_avg: self.histogram.mean() / 1000.0,
            bytes_per_second: if duration_secs > 0.0 {
                self.bytes_sent as f64 / duration_secs
            } else {
                0.0
            },
            distinct_devices: self.serial_numbers.len() as u64,
            device_cardinality,
            status_codes: self.status_codes.clone(),
            formats: self.formats.clone(),
            concurrency,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Final test results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResults {
    pub timestamp: String,
    pub scenario_name: String,
    pub format: String,
    pub duration_secs: f64,
    pub total_requests: u64,
    pub passed_requests: u64,
    pub failed_requests: u64,
    pub status_failures: u64,
    pub transport_failures: u64,
    pub generation_failures: u64,
    pub pass_rate: f64,
    pub requests_per_second: f64,

    // Latency percentiles (ms)
    pub latency_p50: f64,
    pub latency_p90: f64,
    pub latency_p95: f64,
    pub latency_p99: f64,
    pub latency_min: f64,
    pub latency_max: f64,
    pub latency_avg: f64,

    // Throughput
    pub bytes_per_second: f64,

    // Devices seen vs. devices the serial mode can produce
    pub distinct_devices: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_cardinality: Option<u64>,

    pub status_codes: BTreeMap<u16, u64>,
    pub formats: BTreeMap<String, u64>,
    pub concurrency: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulkdata_common::ReportFormat;

    fn result(outcome: Outcome, sn: &str) -> RequestResult {
        RequestResult {
            url: format!("http://localhost:8088/collector?oui=766768&pc=ONU&sn={}", sn),
            serial_number: sn.to_string(),
            format: ReportFormat::ParameterPerRow,
            outcome,
            latency_us: 1500,
            bytes_sent: 100,
            timestamp: Instant::now(),
        }
    }

    #[test]
    fn test_classifies_outcomes() {
        let mut m = MetricsCollector::new();
        m.record(&result(Outcome::Passed, "01AB"));
        m.record(&result(Outcome::Passed, "01AB"));
        m.record(&result(Outcome::StatusFailure(500), "0000"));
        m.record(&result(Outcome::TransportFailure("refused".into()), "1111"));

        let r = m.results("t".into(), "ParameterPerRow".into(), 1, Some(256));
        assert_eq!(r.total_requests, 4);
        assert_eq!(r.passed_requests, 2);
        assert_eq!(r.failed_requests, 2);
        assert_eq!(r.status_failures, 1);
        assert_eq!(r.transport_failures, 1);
        assert_eq!(r.status_codes.get(&200), Some(&2));
        assert_eq!(r.status_codes.get(&500), Some(&1));
        assert_eq!(r.formats.get("ParameterPerRow"), Some(&4));
        assert_eq!(r.distinct_devices, 3);
        assert!((r.pass_rate - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_results() {
        let r = MetricsCollector::new().results("t".into(), "x".into(), 1, None);
        assert_eq!(r.total_requests, 0);
        assert_eq!(r.pass_rate, 0.0);
        assert_eq!(r.requests_per_second, 0.0);
    }
}
