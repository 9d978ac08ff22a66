//! POST /collector - bulk data report ingestion.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bulkdata_common::report::REPORT_FORMAT_HEADER;
use bulkdata_common::{
    parse_name_value_pair, parse_parameter_per_row, DeviceIdentity, ReportError, ReportFormat,
};
use metrics::counter;
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::state::AppState;

/// Device identity carried in the query string.
#[derive(Debug, Default, Deserialize)]
pub struct CollectorQuery {
    #[serde(default)]
    pub oui: String,
    #[serde(default)]
    pub pc: String,
    #[serde(default)]
    pub sn: String,
}

impl CollectorQuery {
    fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(&self.oui, &self.pc, &self.sn)
    }
}

/// POST /collector?oui=..&pc=..&sn=..
#[instrument(skip_all, fields(sn = %query.sn))]
pub async fn collect_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<CollectorQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match collect(&state, &query, &headers, &body).await {
        Ok(format) => {
            counter!("collector_reports_total", "format" => format.header_value()).increment(1);
            StatusCode::OK.into_response()
        }
        Err(err) => {
            counter!("collector_rejected_total").increment(1);
            warn!(error = %err, "Rejected report");
            error_response(&err)
        }
    }
}

async fn collect(
    state: &AppState,
    query: &CollectorQuery,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<ReportFormat, ReportError> {
    let format = headers
        .get(REPORT_FORMAT_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ReportError::MissingHeader(REPORT_FORMAT_HEADER.to_string()))?
        .parse::<ReportFormat>()?;

    let device = query.identity();

    match format {
        ReportFormat::ParameterPerRow => {
            let rows = parse_parameter_per_row(body)?;
            state.service.collect_csv(&device, rows).await?;
        }
        ReportFormat::NameValuePair => {
            let report = parse_name_value_pair(body)?;
            state.service.collect_json(&device, report).await?;
        }
        other => return Err(ReportError::UnsupportedFormat(other.to_string())),
    }

    Ok(format)
}

/// Map a collection error to its HTTP response.
pub fn error_response(err: &ReportError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let message = match err {
        ReportError::InvalidCsv(_) | ReportError::MissingColumn(_) => {
            "Bad Request: Invalid CSV format".to_string()
        }
        ReportError::InvalidTimestamp(_) => "Bad Request: Invalid timestamp format".to_string(),
        ReportError::InvalidParameterType(_) => "Bad Request: Invalid parameter type".to_string(),
        ReportError::InvalidParameterValue { .. } => {
            "Bad Request: Invalid parameter value".to_string()
        }
        ReportError::InvalidJson(_) => "Bad Request: Invalid JSON format".to_string(),
        ReportError::UnsupportedFormat(format) => format!(
            "Bad Request: Unsupported report format {}. The supported report formats are ParameterPerRow and NameValuePair.",
            format
        ),
        ReportError::MissingHeader(name) => format!("Bad Request: Missing {} header", name),
        ReportError::Backpressure => "Too Many Requests".to_string(),
        _ => "Internal Server Error".to_string(),
    };

    (status, message).into_response()
}
