//! Common test fixtures for report generation and collection tests.

use bulkdata_common::device::{DEFAULT_OUI, DEFAULT_PRODUCT_CLASS, DEFAULT_SERIAL_NUMBER};
use bulkdata_common::{DeviceIdentity, Report, SequenceValues, ValueMode};

/// Timestamp of the TR-069 sample report.
pub const FIXED_TIMESTAMP: i64 = 1364529149;

/// Second line of the sample ParameterPerRow report.
pub const EXAMPLE_CSV_SECOND_LINE: &str =
    "1364529149,Device.MoCA.Interface.1.Stats.BroadPktSent,25248,unsignedLong";

/// A minimal valid ParameterPerRow body.
pub const SAMPLE_CSV_BODY: &str = "ReportTimestamp,ParameterName,ParameterValue,ParameterType
1364529149,Device.MoCA.Interface.1.Stats.BroadPktSent,25248,unsignedLong
1364529149,Device.MoCA.Interface.1.Stats.BytesReceived,200543250,unsignedLong
1364529149,Device.DeviceInfo.ProcessStatus.CPUUsage,23,unsignedLong
1364529149,Device.DeviceInfo.MemoryStatus.Free,4352,unsignedLong";

/// A minimal valid NameValuePair body.
pub const SAMPLE_JSON_BODY: &str = r#"{"Report":[{"CollectionTime":1364529149,"Device.MoCA.Interface.1.Stats.BroadPktSent":25248,"Device.DeviceInfo.ProcessStatus.CPUUsage":23}]}"#;

/// The device used by fixed-serial scenarios.
pub fn fixed_identity() -> DeviceIdentity {
    DeviceIdentity::new(DEFAULT_OUI, DEFAULT_PRODUCT_CLASS, DEFAULT_SERIAL_NUMBER)
}

/// A report holding the literal example values at [`FIXED_TIMESTAMP`].
pub fn example_report() -> Report {
    let mut values = SequenceValues::new(vec![0]);
    Report::generate(FIXED_TIMESTAMP, ValueMode::Example, &mut values)
}
