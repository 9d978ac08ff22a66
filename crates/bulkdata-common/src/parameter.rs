//! TR-106 parameter types and typed value parsing.

use crate::error::{ReportError, ReportResult};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Data type of a reported parameter, as named in TR-106.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterType {
    #[serde(rename = "base64")]
    Base64,
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "dateTime")]
    DateTime,
    #[serde(rename = "hexBinary")]
    HexBinary,
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "long")]
    Long,
    #[serde(rename = "unsignedInt")]
    UnsignedInt,
    #[serde(rename = "unsignedLong")]
    UnsignedLong,
    #[serde(rename = "string")]
    String,
}

/// A parameter value parsed according to its [`ParameterType`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Boolean(bool),
    DateTime(DateTime<FixedOffset>),
    Signed(i64),
    Unsigned(u64),
    Text(String),
}

impl ParameterValue {
    /// Numeric reading of the value, as a metrics sample.
    ///
    /// Booleans read as 0/1 and timestamps as unix seconds. Text is parsed as
    /// a number and yields `None` when it is not one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            ParameterValue::DateTime(dt) => Some(dt.timestamp() as f64),
            ParameterValue::Signed(v) => Some(*v as f64),
            ParameterValue::Unsigned(v) => Some(*v as f64),
            ParameterValue::Text(text) => text.trim().parse::<f64>().ok(),
        }
    }
}

impl ParameterType {
    pub const ALL: [ParameterType; 9] = [
        ParameterType::Base64,
        ParameterType::Boolean,
        ParameterType::DateTime,
        ParameterType::HexBinary,
        ParameterType::Int,
        ParameterType::Long,
        ParameterType::UnsignedInt,
        ParameterType::UnsignedLong,
        ParameterType::String,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterType::Base64 => "base64",
            ParameterType::Boolean => "boolean",
            ParameterType::DateTime => "dateTime",
            ParameterType::HexBinary => "hexBinary",
            ParameterType::Int => "int",
            ParameterType::Long => "long",
            ParameterType::UnsignedInt => "unsignedInt",
            ParameterType::UnsignedLong => "unsignedLong",
            ParameterType::String => "string",
        }
    }

    /// Parse a raw textual value of parameter `name`.
    pub fn parse_value(&self, name: &str, raw: &str) -> ReportResult<ParameterValue> {
        let invalid = |message: String| ReportError::InvalidParameterValue {
            name: name.to_string(),
            message,
        };

        match self {
            ParameterType::Base64 | ParameterType::HexBinary | ParameterType::String => {
                Ok(ParameterValue::Text(raw.to_string()))
            }
            ParameterType::Boolean => match raw {
                "1" | "true" | "TRUE" | "True" => Ok(ParameterValue::Boolean(true)),
                "0" | "false" | "FALSE" | "False" => Ok(ParameterValue::Boolean(false)),
                _ => Err(invalid(format!("'{}' is not a boolean", raw))),
            },
            ParameterType::DateTime => DateTime::parse_from_rfc3339(raw)
                .map(ParameterValue::DateTime)
                .map_err(|e| invalid(e.to_string())),
            ParameterType::Int => raw
                .parse::<i32>()
                .map(|v| ParameterValue::Signed(v as i64))
                .map_err(|e| invalid(e.to_string())),
            ParameterType::Long => raw
                .parse::<i64>()
                .map(ParameterValue::Signed)
                .map_err(|e| invalid(e.to_string())),
            ParameterType::UnsignedInt => raw
                .parse::<u32>()
                .map(|v| ParameterValue::Unsigned(v as u64))
                .map_err(|e| invalid(e.to_string())),
            ParameterType::UnsignedLong => raw
                .parse::<u64>()
                .map(ParameterValue::Unsigned)
                .map_err(|e| invalid(e.to_string())),
        }
    }
}

impl FromStr for ParameterType {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParameterType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ReportError::InvalidParameterType(s.to_string()))
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names_round_trip() {
        for t in ParameterType::ALL {
            assert_eq!(t.as_str().parse::<ParameterType>().unwrap(), t);
        }
        assert!("unsignedlong".parse::<ParameterType>().is_err());
    }

    #[test]
    fn test_value_as_f64() {
        assert_eq!(ParameterValue::Boolean(true).as_f64(), Some(1.0));
        assert_eq!(ParameterValue::Signed(-3).as_f64(), Some(-3.0));
        assert_eq!(ParameterValue::Unsigned(25248).as_f64(), Some(25248.0));
        assert_eq!(ParameterValue::Text("4.5".into()).as_f64(), Some(4.5));
        assert_eq!(ParameterValue::Text("eth0".into()).as_f64(), None);
        let dt = ParameterType::DateTime
            .parse_value("Device.DeviceInfo.UpTime", "2013-03-29T03:52:29Z")
            .unwrap();
        assert_eq!(dt.as_f64(), Some(1364529149.0));
    }

    #[test]
    fn test_parse_unsigned_long() {
        let v = ParameterType::UnsignedLong
            .parse_value("Device.MoCA.Interface.1.Stats.BytesSent", "25248")
            .unwrap();
        assert_eq!(v, ParameterValue::Unsigned(25248));
        assert!(ParameterType::UnsignedLong.parse_value("x", "-1").is_err());
    }

    #[test]
    fn test_parse_int_bounds() {
        assert!(ParameterType::Int.parse_value("x", "2147483648").is_err());
        assert_eq!(
            ParameterType::Long.parse_value("x", "2147483648").unwrap(),
            ParameterValue::Signed(2_147_483_648)
        );
        assert!(ParameterType::UnsignedInt.parse_value("x", "4294967296").is_err());
    }

    #[test]
    fn test_parse_boolean_and_datetime() {
        assert_eq!(
            ParameterType::Boolean.parse_value("x", "1").unwrap(),
            ParameterValue::Boolean(true)
        );
        assert!(ParameterType::Boolean.parse_value("x", "yes").is_err());
        assert!(matches!(
            ParameterType::DateTime.parse_value("x", "2013-03-29T03:52:29Z"),
            Ok(ParameterValue::DateTime(_))
        ));
        assert!(ParameterType::DateTime.parse_value("x", "yesterday").is_err());
    }
}
