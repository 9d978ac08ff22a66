//! Collector request generation.

use crate::config::TestConfig;
use bulkdata_common::{
    build_payload, DeviceIdentity, RandomValues, Report, ReportFormat, ReportResult,
    SerialNumberMode, ValueMode, ValueSource,
};
use bytes::Bytes;

/// A rendered report ready to be posted.
#[derive(Debug, Clone)]
pub struct CollectorRequest {
    pub url: String,
    pub format: ReportFormat,
    pub body: Bytes,
    pub identity: DeviceIdentity,
    pub timestamp: i64,
    pub record_count: usize,
}

impl CollectorRequest {
    /// `Content-Type` and `BBF-Report-Format` for this request.
    pub fn headers(&self) -> [(&'static str, &'static str); 2] {
        self.format.headers()
    }
}

/// Builds one worker's requests. Each worker owns its generator, so
/// identity draws never interleave between workers.
pub struct ReportGenerator {
    base_url: String,
    oui: String,
    product_class: String,
    serial_mode: SerialNumberMode,
    value_mode: ValueMode,
    values: Box<dyn ValueSource>,
}

impl ReportGenerator {
    /// Create a generator drawing from `values`.
    pub fn new(config: &TestConfig, values: Box<dyn ValueSource>) -> Self {
        Self {
            base_url: config.base_url.clone(),
            oui: config.oui.clone(),
            product_class: config.product_class.clone(),
            serial_mode: config.serial_number.clone(),
            value_mode: config.values,
            values,
        }
    }

    /// Create the generator of worker `worker`. With a seed, worker `i` uses `seed + i`.
    pub fn for_worker(config: &TestConfig, worker: u32) -> Self {
        let seed = config.seed.map(|s| s.wrapping_add(worker as u64));
        Self::new(config, Box::new(RandomValues::new(seed)))
    }

    /// Resolve a fresh device identity.
    pub fn next_identity(&mut self) -> DeviceIdentity {
        DeviceIdentity::draw(
            &self.oui,
            &self.product_class,
            &self.serial_mode,
            self.values.as_mut(),
        )
    }

    /// Build the next request for `format` stamped with `timestamp`.
    pub fn next_request(
        &mut self,
        format: ReportFormat,
        timestamp: i64,
    ) -> ReportResult<CollectorRequest> {
        let identity = self.next_identity();
        let url = identity.collector_url(&self.base_url)?;
        let report = Report::generate(timestamp, self.value_mode, self.values.as_mut());
        let body = build_payload(format, &report)?;

        Ok(CollectorRequest {
            url,
            format,
            body,
            identity,
            timestamp,
            record_count: report.records().len(),
        })
    }

    /// Build the next request stamped with the current time.
    pub fn next_request_now(&mut self, format: ReportFormat) -> ReportResult<CollectorRequest> {
        self.next_request(format, unix_timestamp())
    }
}

/// Current time in whole seconds since the epoch.
pub fn unix_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulkdata_common::SequenceValues;

    fn fixed_config() -> TestConfig {
        TestConfig {
            serial_number: SerialNumberMode::fixed(),
            values: ValueMode::Example,
            ..TestConfig::default()
        }
    }

    #[test]
    fn test_fixed_csv_request() {
        let mut generator =
            ReportGenerator::new(&fixed_config(), Box::new(SequenceValues::new(vec![0])));
        let request = generator
            .next_request(ReportFormat::ParameterPerRow, 1364529149)
            .unwrap();

        assert_eq!(
            request.url,
            "http://localhost:8088/collector?oui=766768&pc=ONU&sn=400102030405"
        );
        assert_eq!(request.record_count, 10);
        let text = std::str::from_utf8(&request.body).unwrap();
        assert_eq!(
            text.lines().nth(1),
            Some("1364529149,Device.MoCA.Interface.1.Stats.BroadPktSent,25248,unsignedLong")
        );
        assert_eq!(request.headers()[1], ("BBF-Report-Format", "ParameterPerRow"));
    }

    #[test]
    fn test_json_request_headers() {
        let mut generator =
            ReportGenerator::new(&fixed_config(), Box::new(SequenceValues::new(vec![0])));
        let request = generator
            .next_request(ReportFormat::NameValuePair, 1)
            .unwrap();
        assert_eq!(
            request.headers()[0],
            ("Content-Type", "application/json; charset=UTF-8")
        );
        assert!(request.body.starts_with(b"{\"Report\":[{\"CollectionTime\":1,"));
    }

    #[test]
    fn test_unsupported_format_fails() {
        let mut generator = ReportGenerator::for_worker(&TestConfig::default(), 0);
        assert!(generator
            .next_request(ReportFormat::ObjectHierarchy, 1)
            .is_err());
    }

    #[test]
    fn test_seeded_workers_draw_independently() {
        let config = TestConfig {
            seed: Some(9),
            serial_number: SerialNumberMode::BoundedRandom {
                length: 12,
                alphabet: "0123456789ABCDEF".to_string(),
            },
            ..TestConfig::default()
        };

        let draw = |worker| {
            let mut generator = ReportGenerator::for_worker(&config, worker);
            (0..4)
                .map(|_| generator.next_identity().serial_number)
                .collect::<Vec<_>>()
        };

        assert_eq!(draw(0), draw(0));
        assert_ne!(draw(0), draw(1));
    }
}
