//! Results reporting and formatting.

use crate::metrics::TestResults;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};

/// Formats test results for output.
pub struct ResultsReport;

impl ResultsReport {
    /// Format results as a console table.
    pub fn format_table(results: &TestResults) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![format!("Load Test Results: {}", results.scenario_name)]);

        table.add_row(vec!["Format:", results.format.as_str()]);
        table.add_row(vec!["Duration:", &format!("{:.1}s", results.duration_secs)]);
        table.add_row(vec![
            "Total Requests:",
            &format!("{}", results.total_requests),
        ]);
        table.add_row(vec![
            "is status 200:",
            &format!(
                "{:.1}% ({} / {})",
                results.pass_rate, results.passed_requests, results.total_requests
            ),
        ]);
        table.add_row(vec![
            "Failures:",
            &format!(
                "{} status / {} transport / {} generation",
                results.status_failures, results.transport_failures, results.generation_failures
            ),
        ]);
        table.add_row(vec![
            "Requests/sec:",
            &format!("{:.1}", results.requests_per_second),
        ]);

        table.add_row(vec!["", ""]);
        table.add_row(vec!["Latency (ms)", "p50 / p90 / p95 / p99 / max"]);
        table.add_row(vec![
            "",
            &format!(
                "{:.1} / {:.1} / {:.1} / {:.1} / {:.1}",
                results.latency_p50,
                results.latency_p90,
                results.latency_p95,
                results.latency_p99,
                results.latency_max
            ),
        ]);

        table.add_row(vec!["", ""]);
        let devices = match results.device_cardinality {
            Some(cardinality) => format!("{} of {}", results.distinct_devices, cardinality),
            None => format!("{}", results.distinct_devices),
        };
        table.add_row(vec!["Devices:", &devices]);
        if !results.status_codes.is_empty() {
            let codes = results
                .status_codes
                .iter()
                .map(|(code, count)| format!("{}: {}", code, count))
                .collect::<Vec<_>>()
                .join(", ");
            table.add_row(vec!["Status codes:", &codes]);
        }
        table.add_row(vec![
            "Throughput:",
            &format!("{:.1} KB/s", results.bytes_per_second / 1_000.0),
        ]);

        table.to_string()
    }

    /// Format results as JSON.
    pub fn format_json(results: &TestResults) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(results)?)
    }

    /// Format results as CSV row.
    pub fn format_csv(results: &TestResults) -> String {
        format!(
            "{},{},{},{:.1},{},{},{},{:.1},{:.1},{:.1},{:.1}",
            results.timestamp,
            results.scenario_name,
            results.format,
            results.duration_secs,
            results.total_requests,
            results.passed_requests,
            results.failed_requests,
            results.requests_per_second,
            results.latency_p50,
            results.latency_p90,
            results.latency_p99
        )
    }

    /// CSV header row.
    pub fn csv_header() -> &'static str {
        "timestamp,scenario,format,duration,requests,passed,failed,rps,p50,p90,p99"
    }
}
