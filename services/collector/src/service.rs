//! Report sinks behind the collector endpoint.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bulkdata_common::{
    DeviceIdentity, NameValuePairReport, ParameterRow, ReportError, ReportResult,
};
use metrics::counter;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

/// Receives decoded reports.
///
/// Returning [`ReportError::Backpressure`] makes the endpoint answer 429;
/// any other error answers 500.
#[async_trait]
pub trait CollectorService: Send + Sync {
    async fn collect_csv(
        &self,
        device: &DeviceIdentity,
        rows: Vec<ParameterRow>,
    ) -> ReportResult<()>;

    async fn collect_json(
        &self,
        device: &DeviceIdentity,
        report: NameValuePairReport,
    ) -> ReportResult<()>;

    /// Per-device totals, if the service keeps any.
    async fn device_stats(&self) -> Vec<DeviceStats> {
        Vec::new()
    }
}

/// Totals for one device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceStats {
    pub oui: String,
    pub product_class: String,
    pub serial_number: String,
    pub reports: u64,
    pub parameters: u64,
    pub last_report_timestamp: Option<i64>,
}

/// Accepts every report and keeps per-device counts in memory.
#[derive(Default)]
pub struct MockCollectorService {
    devices: RwLock<HashMap<DeviceIdentity, DeviceStats>>,
    in_flight: AtomicUsize,
    max_in_flight: Option<usize>,
    processing_delay: Option<Duration>,
}

impl MockCollectorService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject reports with backpressure while more than `max` are being processed.
    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = Some(max);
        self
    }

    /// Hold each report for `delay` to simulate a slow backend.
    pub fn with_processing_delay(mut self, delay: Duration) -> Self {
        self.processing_delay = Some(delay);
        self
    }

    async fn record(
        &self,
        device: &DeviceIdentity,
        parameters: usize,
        timestamp: Option<i64>,
    ) -> ReportResult<()> {
        let slot = InFlightSlot::acquire(&self.in_flight);
        self.record_inner(device, parameters, timestamp, slot.in_flight)
            .await
    }

    async fn record_inner(
        &self,
        device: &DeviceIdentity,
        parameters: usize,
        timestamp: Option<i64>,
        in_flight: usize,
    ) -> ReportResult<()> {
        if let Some(max) = self.max_in_flight {
            if in_flight > max {
                counter!("collector_backpressure_total").increment(1);
                return Err(ReportError::Backpressure);
            }
        }

        if let Some(delay) = self.processing_delay {
            tokio::time::sleep(delay).await;
        }

        let mut devices = self.devices.write().await;
        let stats = devices.entry(device.clone()).or_insert_with(|| DeviceStats {
            oui: device.oui.clone(),
            product_class: device.product_class.clone(),
            serial_number: device.serial_number.clone(),
            ..Default::default()
        });
        stats.reports += 1;
        stats.parameters += parameters as u64;
        if timestamp.is_some() {
            stats.last_report_timestamp = timestamp;
        }

        debug!(
            serial_number = %device.serial_number,
            parameters,
            reports = stats.reports,
            "Collected report"
        );
        Ok(())
    }
}

/// One report counted in `in_flight`; released on drop, including when the
/// request future is cancelled mid-processing.
struct InFlightSlot<'a> {
    counter: &'a AtomicUsize,
    in_flight: usize,
}

impl<'a> InFlightSlot<'a> {
    fn acquire(counter: &'a AtomicUsize) -> Self {
        let in_flight = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Self { counter, in_flight }
    }
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CollectorService for MockCollectorService {
    async fn collect_csv(
        &self,
        device: &DeviceIdentity,
        rows: Vec<ParameterRow>,
    ) -> ReportResult<()> {
        let timestamp = rows.iter().map(|r| r.report_timestamp).max();
        self.record(device, rows.len(), timestamp).await
    }

    async fn collect_json(
        &self,
        device: &DeviceIdentity,
        report: NameValuePairReport,
    ) -> ReportResult<()> {
        let timestamp = report.collection_times().into_iter().flatten().max();
        self.record(device, report.parameter_count(), timestamp).await
    }

    async fn device_stats(&self) -> Vec<DeviceStats> {
        let devices = self.devices.read().await;
        let mut stats: Vec<DeviceStats> = devices.values().cloned().collect();
        stats.sort_by(|a, b| a.serial_number.cmp(&b.serial_number));
        stats
    }
}
