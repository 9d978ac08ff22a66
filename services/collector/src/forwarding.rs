//! Collector service that forwards report values to the metrics recorder.
//!
//! Each configured instrument maps one parameter name to a metric. Readings
//! are labelled with the reporting device, so the Prometheus exporter exposes
//! one series per device and parameter.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use bulkdata_common::payload::COLLECTION_TIME_KEY;
use bulkdata_common::{
    DeviceIdentity, ExampleParameter, NameValuePairReport, ParameterRow, ReportError,
    ReportResult,
};
use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Label,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::service::CollectorService;

/// Metric type an instrument records into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    /// The reading is the device's cumulative total.
    Counter,
    #[default]
    Gauge,
    Histogram,
}

/// One parameter forwarded as a metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub parameter_name: String,
    pub name: String,
    #[serde(default)]
    pub kind: InstrumentKind,
    #[serde(default)]
    pub description: String,
}

/// Instrument set loaded from YAML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardingConfig {
    #[serde(default)]
    pub instruments: Vec<InstrumentConfig>,
}

impl ForwardingConfig {
    /// Load instruments from a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ForwardingConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// A gauge for each parameter the load generator reports.
    pub fn for_example_parameters() -> Self {
        let instruments = ExampleParameter::ALL
            .iter()
            .map(|p| {
                let parameter_name = p.name();
                InstrumentConfig {
                    name: metric_name(&parameter_name),
                    description: format!("Last reported value of {}", parameter_name),
                    parameter_name,
                    kind: InstrumentKind::Gauge,
                }
            })
            .collect();
        Self { instruments }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.instruments.is_empty() {
            anyhow::bail!("at least one instrument must be configured");
        }
        let mut seen = HashSet::new();
        for instrument in &self.instruments {
            if instrument.parameter_name.is_empty() || instrument.name.is_empty() {
                anyhow::bail!("instrument parameter_name and name must not be empty");
            }
            if !seen.insert(instrument.parameter_name.as_str()) {
                anyhow::bail!(
                    "parameter '{}' is mapped to more than one instrument",
                    instrument.parameter_name
                );
            }
        }
        Ok(())
    }
}

/// `Device.DeviceInfo.ProcessStatus.CPUUsage` becomes
/// `bulkdata_device_deviceinfo_processstatus_cpuusage`.
fn metric_name(parameter_name: &str) -> String {
    let mut name = String::from("bulkdata_");
    for c in parameter_name.chars() {
        if c.is_ascii_alphanumeric() {
            name.push(c.to_ascii_lowercase());
        } else {
            name.push('_');
        }
    }
    name
}

/// Records every instrumented reading on the installed metrics recorder.
pub struct MetricsCollectorService {
    instruments: HashMap<String, InstrumentConfig>,
}

impl MetricsCollectorService {
    pub fn new(config: &ForwardingConfig) -> Self {
        let mut instruments = HashMap::with_capacity(config.instruments.len());
        for instrument in &config.instruments {
            let name = instrument.name.clone();
            let description = instrument.description.clone();
            match instrument.kind {
                InstrumentKind::Counter => {
                    describe_counter!(name, description);
                }
                InstrumentKind::Gauge => {
                    describe_gauge!(name, description);
                }
                InstrumentKind::Histogram => {
                    describe_histogram!(name, description);
                }
            }
            instruments.insert(instrument.parameter_name.clone(), instrument.clone());
        }
        Self { instruments }
    }

    /// Forward a ParameterPerRow report.
    ///
    /// Rows are grouped by report timestamp and applied oldest first, so a
    /// gauge ends on the latest reading. Every row's value must parse as its
    /// declared type, instrumented or not. Returns the number of samples
    /// recorded.
    pub fn forward_rows(
        &self,
        device: &DeviceIdentity,
        rows: &[ParameterRow],
    ) -> ReportResult<usize> {
        let mut reports: BTreeMap<i64, Vec<&ParameterRow>> = BTreeMap::new();
        for row in rows {
            reports.entry(row.report_timestamp).or_default().push(row);
        }

        let mut samples = 0;
        for (timestamp, report) in reports {
            for row in report {
                let value = row.typed_value()?;
                let Some(instrument) = self.instruments.get(&row.parameter_name) else {
                    continue;
                };
                let sample = value
                    .as_f64()
                    .ok_or_else(|| not_numeric(&row.parameter_name, &row.parameter_value))?;
                record(instrument, device, sample)?;
                samples += 1;
            }
            debug!(serial_number = %device.serial_number, timestamp, "Forwarded report");
        }
        Ok(samples)
    }

    /// Forward a NameValuePair report, entries in collection-time order.
    pub fn forward_report(
        &self,
        device: &DeviceIdentity,
        report: &NameValuePairReport,
    ) -> ReportResult<usize> {
        let times = report.collection_times();
        let mut order: Vec<usize> = (0..report.report.len()).collect();
        order.sort_by_key(|&i| times[i]);

        let mut samples = 0;
        for i in order {
            for (name, value) in &report.report[i] {
                if name == COLLECTION_TIME_KEY {
                    continue;
                }
                let Some(instrument) = self.instruments.get(name) else {
                    continue;
                };
                let sample = json_sample(value).ok_or_else(|| not_numeric(name, value))?;
                record(instrument, device, sample)?;
                samples += 1;
            }
        }
        Ok(samples)
    }
}

fn not_numeric(name: &str, value: impl std::fmt::Display) -> ReportError {
    ReportError::InvalidParameterValue {
        name: name.to_string(),
        message: format!("'{}' is not numeric", value),
    }
}

fn json_sample(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn record(
    instrument: &InstrumentConfig,
    device: &DeviceIdentity,
    sample: f64,
) -> ReportResult<()> {
    let labels = vec![
        Label::new("oui", device.oui.clone()),
        Label::new("product_class", device.product_class.clone()),
        Label::new("serial_number", device.serial_number.clone()),
    ];
    let name = instrument.name.clone();
    match instrument.kind {
        InstrumentKind::Counter => {
            if !sample.is_finite() || sample < 0.0 {
                return Err(ReportError::InvalidParameterValue {
                    name: instrument.parameter_name.clone(),
                    message: format!("counter reading {} is negative", sample),
                });
            }
            counter!(name, labels).absolute(sample as u64);
        }
        InstrumentKind::Gauge => {
            gauge!(name, labels).set(sample);
        }
        InstrumentKind::Histogram => {
            histogram!(name, labels).record(sample);
        }
    }
    Ok(())
}

#[async_trait]
impl CollectorService for MetricsCollectorService {
    async fn collect_csv(
        &self,
        device: &DeviceIdentity,
        rows: Vec<ParameterRow>,
    ) -> ReportResult<()> {
        let samples = self.forward_rows(device, &rows)?;
        counter!("collector_samples_forwarded_total").increment(samples as u64);
        Ok(())
    }

    async fn collect_json(
        &self,
        device: &DeviceIdentity,
        report: NameValuePairReport,
    ) -> ReportResult<()> {
        let samples = self.forward_report(device, &report)?;
        counter!("collector_samples_forwarded_total").increment(samples as u64);
        Ok(())
    }
}
