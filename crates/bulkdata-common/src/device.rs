//! Device identity and serial number selection.

use crate::error::{ReportError, ReportResult};
use crate::values::ValueSource;
use serde::{Deserialize, Serialize};
use url::Url;

/// Organizationally unique identifier of the simulated vendor.
pub const DEFAULT_OUI: &str = "766768";

/// Product class of the simulated devices.
pub const DEFAULT_PRODUCT_CLASS: &str = "ONU";

/// Serial number used by the `fixed` selection mode.
pub const DEFAULT_SERIAL_NUMBER: &str = "400102030405";

/// Serial numbers used by the `list_pick` selection mode.
pub const SERIAL_NUMBERS: [&str; 10] = [
    "400102030405",
    "400102030406",
    "400102030407",
    "400102030408",
    "400102030409",
    "400102030410",
    "400102030411",
    "400102030412",
    "400102030413",
    "400102030414",
];

/// Length of serial numbers drawn by the `bounded_random` mode.
pub const DEFAULT_SERIAL_LENGTH: usize = 4;

/// Alphabet of the `bounded_random` mode. 4 symbols at length 4 gives 256 devices.
pub const DEFAULT_SERIAL_ALPHABET: &str = "01AB";

/// Path of the collector endpoint, relative to the base URL.
pub const COLLECTOR_PATH: &str = "collector";

/// Identity a report is sent under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub oui: String,
    pub product_class: String,
    pub serial_number: String,
}

impl DeviceIdentity {
    pub fn new(
        oui: impl Into<String>,
        product_class: impl Into<String>,
        serial_number: impl Into<String>,
    ) -> Self {
        Self {
            oui: oui.into(),
            product_class: product_class.into(),
            serial_number: serial_number.into(),
        }
    }

    /// Draw a fresh identity, resolving the serial number with `mode`.
    pub fn draw(
        oui: &str,
        product_class: &str,
        mode: &SerialNumberMode,
        values: &mut dyn ValueSource,
    ) -> Self {
        Self::new(oui, product_class, mode.resolve(values))
    }

    /// Build `<base>/collector?oui=..&pc=..&sn=..` for this identity.
    pub fn collector_url(&self, base_url: &str) -> ReportResult<String> {
        let mut url = Url::parse(base_url)
            .map_err(|e| ReportError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        url.path_segments_mut()
            .map_err(|_| ReportError::InvalidUrl(format!("{} cannot be a base URL", base_url)))?
            .pop_if_empty()
            .push(COLLECTOR_PATH);

        url.query_pairs_mut()
            .clear()
            .append_pair("oui", &self.oui)
            .append_pair("pc", &self.product_class)
            .append_pair("sn", &self.serial_number);

        Ok(url.to_string())
    }
}

/// How each iteration picks the serial number of its device.
///
/// Chosen once per run; a run never mixes modes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SerialNumberMode {
    /// Always the same device.
    Fixed {
        #[serde(default = "default_serial_number")]
        serial_number: String,
    },
    /// Uniform pick from a list.
    ListPick {
        #[serde(default = "default_serial_numbers")]
        serial_numbers: Vec<String>,
    },
    /// Random string of fixed length over a small alphabet.
    BoundedRandom {
        #[serde(default = "default_serial_length")]
        length: usize,
        #[serde(default = "default_serial_alphabet")]
        alphabet: String,
    },
}

fn default_serial_number() -> String {
    DEFAULT_SERIAL_NUMBER.to_string()
}

fn default_serial_numbers() -> Vec<String> {
    SERIAL_NUMBERS.iter().map(|s| s.to_string()).collect()
}

fn default_serial_length() -> usize {
    DEFAULT_SERIAL_LENGTH
}

fn default_serial_alphabet() -> String {
    DEFAULT_SERIAL_ALPHABET.to_string()
}

impl Default for SerialNumberMode {
    fn default() -> Self {
        SerialNumberMode::BoundedRandom {
            length: DEFAULT_SERIAL_LENGTH,
            alphabet: DEFAULT_SERIAL_ALPHABET.to_string(),
        }
    }
}

impl SerialNumberMode {
    pub fn fixed() -> Self {
        SerialNumberMode::Fixed {
            serial_number: default_serial_number(),
        }
    }

    pub fn list_pick() -> Self {
        SerialNumberMode::ListPick {
            serial_numbers: default_serial_numbers(),
        }
    }

    /// Resolve one serial number.
    pub fn resolve(&self, values: &mut dyn ValueSource) -> String {
        match self {
            SerialNumberMode::Fixed { serial_number } => serial_number.clone(),
            SerialNumberMode::ListPick { serial_numbers } => {
                if serial_numbers.is_empty() {
                    return DEFAULT_SERIAL_NUMBER.to_string();
                }
                serial_numbers[values.next_index(serial_numbers.len())].clone()
            }
            SerialNumberMode::BoundedRandom { length, alphabet } => {
                let symbols: Vec<char> = alphabet.chars().collect();
                if symbols.is_empty() {
                    return String::new();
                }
                (0..*length)
                    .map(|_| symbols[values.next_index(symbols.len())])
                    .collect()
            }
        }
    }

    /// Number of distinct serial numbers this mode can produce, if it fits in a u64.
    pub fn cardinality(&self) -> Option<u64> {
        match self {
            SerialNumberMode::Fixed { .. } => Some(1),
            SerialNumberMode::ListPick { serial_numbers } => {
                let mut distinct: Vec<&String> = serial_numbers.iter().collect();
                distinct.sort();
                distinct.dedup();
                Some(distinct.len() as u64)
            }
            SerialNumberMode::BoundedRandom { length, alphabet } => {
                let base = alphabet.chars().count() as u64;
                let exp = u32::try_from(*length).ok()?;
                base.checked_pow(exp)
            }
        }
    }

    /// Reject modes that cannot produce a usable serial number.
    pub fn validate(&self) -> ReportResult<()> {
        match self {
            SerialNumberMode::Fixed { serial_number } => {
                if serial_number.is_empty() {
                    return Err(ReportError::InvalidSerialMode(
                        "fixed serial_number must not be empty".to_string(),
                    ));
                }
            }
            SerialNumberMode::ListPick { serial_numbers } => {
                if serial_numbers.is_empty() {
                    return Err(ReportError::InvalidSerialMode(
                        "list_pick needs at least one serial number".to_string(),
                    ));
                }
                if serial_numbers.iter().any(|s| s.is_empty()) {
                    return Err(ReportError::InvalidSerialMode(
                        "list_pick serial numbers must not be empty".to_string(),
                    ));
                }
            }
            SerialNumberMode::BoundedRandom { length, alphabet } => {
                if *length == 0 {
                    return Err(ReportError::InvalidSerialMode(
                        "bounded_random length must be > 0".to_string(),
                    ));
                }
                if alphabet.is_empty() || !alphabet.is_ascii() {
                    return Err(ReportError::InvalidSerialMode(format!(
                        "bounded_random alphabet must be non-empty ASCII, got '{}'",
                        alphabet
                    )));
                }
                let mut symbols: Vec<char> = alphabet.chars().collect();
                symbols.sort_unstable();
                symbols.dedup();
                if symbols.len() != alphabet.len() {
                    return Err(ReportError::InvalidSerialMode(format!(
                        "bounded_random alphabet '{}' repeats a symbol",
                        alphabet
                    )));
                }
            }
        }
        Ok(())
    }
}
