//! Common types shared by the bulk data collector and its load generator.
//!
//! Everything in this crate is pure: device identities, TR-106 parameter types,
//! the report model and the two BBF report encodings. Randomness enters only
//! through the [`ValueSource`] trait so callers decide how values are drawn.

pub mod device;
pub mod error;
pub mod parameter;
pub mod payload;
pub mod report;
pub mod values;

pub use device::{DeviceIdentity, SerialNumberMode};
pub use error::{ReportError, ReportResult};
pub use parameter::{ParameterType, ParameterValue};
pub use payload::{build_payload, parse_name_value_pair, parse_parameter_per_row};
pub use payload::{NameValuePairReport, ParameterRow};
pub use report::{ExampleParameter, Report, ReportFormat, ReportRecord, ValueMode};
pub use values::{RandomValues, SequenceValues, ValueSource};
