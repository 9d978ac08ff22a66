//! Error types for report encoding, decoding and collection.

use thiserror::Error;

/// Result type alias using ReportError.
pub type ReportResult<T> = Result<T, ReportError>;

/// Primary error type for bulk data report operations.
#[derive(Debug, Error)]
pub enum ReportError {
    // === Decoding Errors ===
    #[error("Invalid parameter type: {0}")]
    InvalidParameterType(String),

    #[error("Invalid value for parameter '{name}': {message}")]
    InvalidParameterValue { name: String, message: String },

    #[error("Invalid CSV format: {0}")]
    InvalidCsv(String),

    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),

    #[error("Invalid timestamp format: {0}")]
    InvalidTimestamp(String),

    #[error("Missing report column: {0}")]
    MissingColumn(String),

    // === Request Errors ===
    #[error("Unsupported report format: {0}")]
    UnsupportedFormat(String),

    #[error("Missing header: {0}")]
    MissingHeader(String),

    #[error("Invalid collector URL: {0}")]
    InvalidUrl(String),

    // === Generation Errors ===
    #[error("A report carries 4 to 10 records, got {0}")]
    InvalidRecordCount(usize),

    // === Configuration Errors ===
    #[error("Invalid serial number mode: {0}")]
    InvalidSerialMode(String),

    // === Collector Errors ===
    #[error("Collector is applying backpressure")]
    Backpressure,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReportError {
    /// Get the HTTP status code a collector answers with for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            ReportError::InvalidParameterType(_)
            | ReportError::InvalidParameterValue { .. }
            | ReportError::InvalidCsv(_)
            | ReportError::InvalidJson(_)
            | ReportError::InvalidTimestamp(_)
            | ReportError::MissingColumn(_)
            | ReportError::UnsupportedFormat(_)
            | ReportError::MissingHeader(_) => 400,

            ReportError::Backpressure => 429,

            _ => 500,
        }
    }
}

impl From<csv::Error> for ReportError {
    fn from(err: csv::Error) -> Self {
        ReportError::InvalidCsv(err.to_string())
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(err: serde_json::Error) -> Self {
        ReportError::InvalidJson(err.to_string())
    }
}
