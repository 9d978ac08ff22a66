//! Report model: formats, the example parameter set and generated reports.

use crate::error::{ReportError, ReportResult};
use crate::parameter::ParameterType;
use crate::values::ValueSource;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the HTTP header that declares the report encoding.
pub const REPORT_FORMAT_HEADER: &str = "BBF-Report-Format";

/// Content type of ParameterPerRow bodies.
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=UTF-8; header=present";

/// Content type of NameValuePair bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Smallest number of records in a report.
pub const MIN_RECORDS: usize = 4;

/// Largest number of records in a report.
pub const MAX_RECORDS: usize = 10;

/// TR-069 / TR-369 bulk data report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportFormat {
    /// CSV, one parameter per row.
    ParameterPerRow,
    /// CSV, one parameter per column. Not accepted by the collector.
    ParameterPerColumn,
    /// JSON, flat name to value map.
    NameValuePair,
    /// JSON, nested objects. Not accepted by the collector.
    ObjectHierarchy,
}

impl ReportFormat {
    /// Value of the `BBF-Report-Format` header.
    pub fn header_value(&self) -> &'static str {
        match self {
            ReportFormat::ParameterPerRow => "ParameterPerRow",
            ReportFormat::ParameterPerColumn => "ParameterPerColumn",
            ReportFormat::NameValuePair => "NameValuePair",
            ReportFormat::ObjectHierarchy => "ObjectHierarchy",
        }
    }

    /// Value of the `Content-Type` header.
    pub fn content_type(&self) -> &'static str {
        match self {
            ReportFormat::ParameterPerRow | ReportFormat::ParameterPerColumn => CSV_CONTENT_TYPE,
            ReportFormat::NameValuePair | ReportFormat::ObjectHierarchy => JSON_CONTENT_TYPE,
        }
    }

    /// Header pairs a request carrying this format needs.
    pub fn headers(&self) -> [(&'static str, &'static str); 2] {
        [
            ("Content-Type", self.content_type()),
            (REPORT_FORMAT_HEADER, self.header_value()),
        ]
    }

    /// Whether reports in this format can be generated and collected.
    pub fn is_supported(&self) -> bool {
        matches!(
            self,
            ReportFormat::ParameterPerRow | ReportFormat::NameValuePair
        )
    }
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ParameterPerRow" => Ok(ReportFormat::ParameterPerRow),
            "ParameterPerColumn" => Ok(ReportFormat::ParameterPerColumn),
            "NameValuePair" => Ok(ReportFormat::NameValuePair),
            "ObjectHierarchy" => Ok(ReportFormat::ObjectHierarchy),
            other => Err(ReportError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header_value())
    }
}

/// The fixed set of parameters every generated report carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExampleParameter {
    MocaBroadPktSent(u8),
    MocaBytesReceived(u8),
    MocaBytesSent(u8),
    MocaMultiPktReceived(u8),
    CpuUsage,
    MemoryFree,
}

impl ExampleParameter {
    /// All parameters in report order.
    pub const ALL: [ExampleParameter; 10] = [
        ExampleParameter::MocaBroadPktSent(1),
        ExampleParameter::MocaBytesReceived(1),
        ExampleParameter::MocaBytesSent(1),
        ExampleParameter::MocaMultiPktReceived(1),
        ExampleParameter::MocaBroadPktSent(2),
        ExampleParameter::MocaBytesReceived(2),
        ExampleParameter::MocaBytesSent(2),
        ExampleParameter::MocaMultiPktReceived(2),
        ExampleParameter::CpuUsage,
        ExampleParameter::MemoryFree,
    ];

    /// Dotted data model path.
    pub fn name(&self) -> String {
        match self {
            ExampleParameter::MocaBroadPktSent(i) => {
                format!("Device.MoCA.Interface.{}.Stats.BroadPktSent", i)
            }
            ExampleParameter::MocaBytesReceived(i) => {
                format!("Device.MoCA.Interface.{}.Stats.BytesReceived", i)
            }
            ExampleParameter::MocaBytesSent(i) => {
                format!("Device.MoCA.Interface.{}.Stats.BytesSent", i)
            }
            ExampleParameter::MocaMultiPktReceived(i) => {
                format!("Device.MoCA.Interface.{}.Stats.MultiPktReceived", i)
            }
            ExampleParameter::CpuUsage => "Device.DeviceInfo.ProcessStatus.CPUUsage".to_string(),
            ExampleParameter::MemoryFree => "Device.DeviceInfo.MemoryStatus.Free".to_string(),
        }
    }

    /// Inclusive bounds of randomly generated values.
    pub fn bounds(&self) -> (u64, u64) {
        match self {
            ExampleParameter::CpuUsage => (0, 100),
            ExampleParameter::MemoryFree => (0, 8_000),
            _ => (0, 10_000),
        }
    }

    /// Literal value used when reports are held constant.
    pub fn example_value(&self) -> u64 {
        match self {
            ExampleParameter::MocaBroadPktSent(1) => 25248,
            ExampleParameter::MocaBytesReceived(1) => 200543250,
            ExampleParameter::MocaBytesSent(1) => 7682161,
            ExampleParameter::MocaMultiPktReceived(1) => 890682272,
            ExampleParameter::MocaBroadPktSent(_) => 93247,
            ExampleParameter::MocaBytesReceived(_) => 900000123,
            ExampleParameter::MocaBytesSent(_) => 8891021,
            ExampleParameter::MocaMultiPktReceived(_) => 34245,
            ExampleParameter::CpuUsage => 23,
            ExampleParameter::MemoryFree => 4352,
        }
    }

    pub fn parameter_type(&self) -> ParameterType {
        ParameterType::UnsignedLong
    }
}

/// How parameter values are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueMode {
    /// Drawn from the value source within each parameter's bounds.
    #[default]
    Random,
    /// The literal example values.
    Example,
}

/// One parameter reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub timestamp: i64,
    pub name: String,
    pub value: u64,
    pub parameter_type: ParameterType,
}

/// An ordered set of readings taken at one instant.
///
/// Built only by [`Report::new`] or [`Report::generate`]; every record
/// carries the report timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    timestamp: i64,
    records: Vec<ReportRecord>,
}

impl Report {
    /// Build a report; every record is stamped with `timestamp`.
    pub fn new<I, S>(timestamp: i64, readings: I) -> ReportResult<Self>
    where
        I: IntoIterator<Item = (S, u64, ParameterType)>,
        S: Into<String>,
    {
        let records: Vec<ReportRecord> = readings
            .into_iter()
            .map(|(name, value, parameter_type)| ReportRecord {
                timestamp,
                name: name.into(),
                value,
                parameter_type,
            })
            .collect();

        if !(MIN_RECORDS..=MAX_RECORDS).contains(&records.len()) {
            return Err(ReportError::InvalidRecordCount(records.len()));
        }

        Ok(Self { timestamp, records })
    }

    /// Generate a report over [`ExampleParameter::ALL`].
    pub fn generate(timestamp: i64, mode: ValueMode, values: &mut dyn ValueSource) -> Self {
        let records = ExampleParameter::ALL
            .iter()
            .map(|p| {
                let value = match mode {
                    ValueMode::Random => {
                        let (min, max) = p.bounds();
                        values.next_in_range(min, max)
                    }
                    ValueMode::Example => p.example_value(),
                };
                ReportRecord {
                    timestamp,
                    name: p.name(),
                    value,
                    parameter_type: p.parameter_type(),
                }
            })
            .collect();

        Self { timestamp, records }
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn records(&self) -> &[ReportRecord] {
        &self.records
    }

    /// True when every record carries the report timestamp.
    pub fn has_single_timestamp(&self) -> bool {
        self.records.iter().all(|r| r.timestamp == self.timestamp)
    }
}
