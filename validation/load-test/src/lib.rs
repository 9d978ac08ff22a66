//! Load testing tool for TR-069 / TR-369 bulk data collectors.
//!
//! This crate provides tools to:
//! - Generate device reports in the ParameterPerRow and NameValuePair encodings
//! - Post them to a collector from one or more simulated devices
//! - Collect pass/fail and latency metrics
//! - Output results in multiple formats (console, JSON, CSV)

pub mod config;
pub mod generator;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod sender;

pub use config::{FormatSelection, TestConfig};
pub use generator::{CollectorRequest, ReportGenerator};
pub use metrics::{MetricsCollector, TestResults};
pub use report::ResultsReport;
pub use runner::LoadRunner;
pub use sender::{generate_and_send, send, CollectorClient, Outcome, RequestResult};
