//! Shared application state.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::service::CollectorService;

/// State shared by all handlers.
pub struct AppState {
    pub service: Arc<dyn CollectorService>,
    /// Absent when no recorder was installed (tests).
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(service: Arc<dyn CollectorService>) -> Self {
        Self {
            service,
            prometheus: None,
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}
