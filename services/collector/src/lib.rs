//! Bulk Data Collector Service Library
//!
//! HTTP endpoint that accepts TR-069 / TR-369 bulk data reports in the
//! ParameterPerRow (CSV) and NameValuePair (JSON) encodings and hands the
//! decoded reports to a [`service::CollectorService`]: the in-memory mock or
//! the metrics-forwarding [`forwarding::MetricsCollectorService`].

pub mod forwarding;
pub mod handlers;
pub mod service;
pub mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the collector router around `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/collector", post(handlers::collect::collect_handler))
        .route("/health", get(handlers::health::health_handler))
        .route("/stats", get(handlers::health::stats_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}
