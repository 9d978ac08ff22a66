//! Wire encodings of a [`Report`].
//!
//! `ParameterPerRow` is CSV with a header row naming the columns;
//! `NameValuePair` is a JSON object holding a one-element `Report` array whose
//! element maps each parameter name straight to its value.

use crate::error::{ReportError, ReportResult};
use crate::parameter::{ParameterType, ParameterValue};
use crate::report::{Report, ReportFormat};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const COLUMN_REPORT_TIMESTAMP: &str = "ReportTimestamp";
pub const COLUMN_PARAMETER_NAME: &str = "ParameterName";
pub const COLUMN_PARAMETER_VALUE: &str = "ParameterValue";
pub const COLUMN_PARAMETER_TYPE: &str = "ParameterType";

/// Header row of a ParameterPerRow report.
pub const PARAMETER_PER_ROW_HEADER: [&str; 4] = [
    COLUMN_REPORT_TIMESTAMP,
    COLUMN_PARAMETER_NAME,
    COLUMN_PARAMETER_VALUE,
    COLUMN_PARAMETER_TYPE,
];

/// Key carrying the shared timestamp in a NameValuePair report.
pub const COLLECTION_TIME_KEY: &str = "CollectionTime";

/// Render `report` in `format`.
pub fn build_payload(format: ReportFormat, report: &Report) -> ReportResult<Bytes> {
    match format {
        ReportFormat::ParameterPerRow => render_parameter_per_row(report),
        ReportFormat::NameValuePair => render_name_value_pair(report),
        other => Err(ReportError::UnsupportedFormat(other.to_string())),
    }
}

fn render_parameter_per_row(report: &Report) -> ReportResult<Bytes> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(PARAMETER_PER_ROW_HEADER)?;
    for record in report.records() {
        let timestamp = record.timestamp.to_string();
        let value = record.value.to_string();
        writer.write_record([
            timestamp.as_str(),
            record.name.as_str(),
            value.as_str(),
            record.parameter_type.as_str(),
        ])?;
    }

    let mut data = writer
        .into_inner()
        .map_err(|e| ReportError::Internal(e.to_string()))?;
    // Rows are newline separated, not terminated.
    if data.last() == Some(&b'\n') {
        data.pop();
    }
    Ok(Bytes::from(data))
}

fn render_name_value_pair(report: &Report) -> ReportResult<Bytes> {
    let mut entry = Map::new();
    entry.insert(COLLECTION_TIME_KEY.to_string(), Value::from(report.timestamp()));
    for record in report.records() {
        entry.insert(record.name.clone(), Value::from(record.value));
    }

    let body = NameValuePairReport {
        report: vec![entry],
    };
    Ok(Bytes::from(serde_json::to_vec(&body)?))
}

/// One decoded row of a ParameterPerRow report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterRow {
    pub report_timestamp: i64,
    pub parameter_name: String,
    pub parameter_value: String,
    pub parameter_type: ParameterType,
}

impl ParameterRow {
    /// Parse the raw value according to the row's declared type.
    pub fn typed_value(&self) -> ReportResult<ParameterValue> {
        self.parameter_type
            .parse_value(&self.parameter_name, &self.parameter_value)
    }
}

/// Decode a ParameterPerRow body. Columns are located by the header row.
pub fn parse_parameter_per_row(body: &[u8]) -> ReportResult<Vec<ParameterRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(body);

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ReportError::MissingColumn(name.to_string()))
    };
    let timestamp_idx = column(COLUMN_REPORT_TIMESTAMP)?;
    let name_idx = column(COLUMN_PARAMETER_NAME)?;
    let value_idx = column(COLUMN_PARAMETER_VALUE)?;
    let type_idx = column(COLUMN_PARAMETER_TYPE)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |idx: usize| record.get(idx).unwrap_or_default();

        let raw_timestamp = field(timestamp_idx);
        let report_timestamp = raw_timestamp
            .parse::<i64>()
            .map_err(|_| ReportError::InvalidTimestamp(raw_timestamp.to_string()))?;
        let parameter_type = field(type_idx).parse::<ParameterType>()?;

        rows.push(ParameterRow {
            report_timestamp,
            parameter_name: field(name_idx).to_string(),
            parameter_value: field(value_idx).to_string(),
            parameter_type,
        });
    }

    Ok(rows)
}

/// Body of a NameValuePair report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NameValuePairReport {
    #[serde(rename = "Report", default)]
    pub report: Vec<Map<String, Value>>,
}

impl NameValuePairReport {
    /// Parameter names of every entry, excluding `CollectionTime`.
    pub fn parameter_names(&self) -> Vec<&str> {
        self.report
            .iter()
            .flat_map(|entry| entry.keys())
            .map(String::as_str)
            .filter(|k| *k != COLLECTION_TIME_KEY)
            .collect()
    }

    /// Number of parameter readings across all entries.
    pub fn parameter_count(&self) -> usize {
        self.parameter_names().len()
    }

    /// Collection time of each entry, when present and integral.
    pub fn collection_times(&self) -> Vec<Option<i64>> {
        self.report
            .iter()
            .map(|entry| entry.get(COLLECTION_TIME_KEY).and_then(Value::as_i64))
            .collect()
    }
}

/// Decode a NameValuePair body.
pub fn parse_name_value_pair(body: &[u8]) -> ReportResult<NameValuePairReport> {
    Ok(serde_json::from_slice(body)?)
}
