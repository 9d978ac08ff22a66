//! Configuration loading and management.

use bulkdata_common::device::{DEFAULT_OUI, DEFAULT_PRODUCT_CLASS};
use bulkdata_common::{DeviceIdentity, ReportFormat, SerialNumberMode, ValueMode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Main test configuration loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,
    /// Number of simulated devices posting in parallel.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
    /// Per-worker pacing; unset means back-to-back iterations.
    #[serde(default)]
    pub requests_per_second: Option<f64>,
    #[serde(default)]
    pub warmup_secs: u64,
    /// Per-worker iteration cap; the run also stops at the deadline.
    #[serde(default)]
    pub max_iterations: Option<u64>,
    #[serde(default)]
    pub seed: Option<u64>, // Optional RNG seed for reproducible tests
    #[serde(default)]
    pub format: FormatSelection,
    #[serde(default)]
    pub serial_number: SerialNumberMode,
    #[serde(default)]
    pub values: ValueMode,
    #[serde(default = "default_oui")]
    pub oui: String,
    #[serde(default = "default_product_class")]
    pub product_class: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub log_requests: bool, // Log all requests to file for debugging
    #[serde(default = "default_results_dir")]
    pub results_dir: String,
}

fn default_base_url() -> String {
    "http://localhost:8088".to_string()
}

fn default_duration_secs() -> u64 {
    300
}

fn default_concurrency() -> u32 {
    1
}

fn default_oui() -> String {
    DEFAULT_OUI.to_string()
}

fn default_product_class() -> String {
    DEFAULT_PRODUCT_CLASS.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_results_dir() -> String {
    "results".to_string()
}

impl Default for TestConfig {
    /// One device posting ParameterPerRow reports for five minutes.
    fn default() -> Self {
        Self {
            name: "collector".to_string(),
            description: "ParameterPerRow reports from one simulated device".to_string(),
            base_url: default_base_url(),
            duration_secs: default_duration_secs(),
            concurrency: default_concurrency(),
            requests_per_second: None,
            warmup_secs: 0,
            max_iterations: None,
            seed: None,
            format: FormatSelection::default(),
            serial_number: SerialNumberMode::default(),
            values: ValueMode::default(),
            oui: default_oui(),
            product_class: default_product_class(),
            request_timeout_secs: default_request_timeout_secs(),
            log_requests: false,
            results_dir: default_results_dir(),
        }
    }
}

/// Which report encoding each iteration sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatSelection {
    /// CSV only.
    #[default]
    ParameterPerRow,
    /// JSON only.
    NameValuePair,
    /// CSV on even iterations, JSON on odd ones.
    Alternate,
}

impl FormatSelection {
    /// Format for a worker's `iteration` (0-based).
    pub fn format_for(&self, iteration: u64) -> ReportFormat {
        match self {
            FormatSelection::ParameterPerRow => ReportFormat::ParameterPerRow,
            FormatSelection::NameValuePair => ReportFormat::NameValuePair,
            FormatSelection::Alternate => {
                if iteration % 2 == 0 {
                    ReportFormat::ParameterPerRow
                } else {
                    ReportFormat::NameValuePair
                }
            }
        }
    }
}

impl FromStr for FormatSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" | "parameter_per_row" | "parameterperrow" => Ok(FormatSelection::ParameterPerRow),
            "json" | "name_value_pair" | "namevaluepair" => Ok(FormatSelection::NameValuePair),
            "alternate" | "both" => Ok(FormatSelection::Alternate),
            other => Err(format!(
                "unknown format '{}', expected csv, json or alternate",
                other
            )),
        }
    }
}

impl fmt::Display for FormatSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormatSelection::ParameterPerRow => "ParameterPerRow",
            FormatSelection::NameValuePair => "NameValuePair",
            FormatSelection::Alternate => "ParameterPerRow+NameValuePair",
        };
        f.write_str(name)
    }
}

impl TestConfig {
    /// Load configuration from YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TestConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Per-worker gap between iteration starts when a rate is configured.
    pub fn pacing_interval(&self) -> anyhow::Result<Option<Duration>> {
        let Some(rps) = self.requests_per_second else {
            return Ok(None);
        };
        if !rps.is_finite() || rps <= 0.0 {
            anyhow::bail!("requests_per_second must be > 0");
        }
        let interval = Duration::try_from_secs_f64(1.0 / rps).map_err(|e| {
            anyhow::anyhow!("requests_per_second {} is too low to pace requests: {}", rps, e)
        })?;
        Ok(Some(interval))
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.duration_secs == 0 {
            anyhow::bail!("duration_secs must be > 0");
        }
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be > 0");
        }
        self.pacing_interval()?;
        if self.max_iterations == Some(0) {
            anyhow::bail!("max_iterations must be > 0 when set");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be > 0");
        }
        if self.oui.is_empty() || self.product_class.is_empty() {
            anyhow::bail!("oui and product_class must not be empty");
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            anyhow::bail!("base_url must be an http or https URL, got '{}'", self.base_url);
        }
        DeviceIdentity::new(&self.oui, &self.product_class, "0").collector_url(&self.base_url)?;
        self.serial_number.validate()?;
        Ok(())
    }
}
