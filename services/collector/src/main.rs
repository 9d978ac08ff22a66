//! Bulk Data Collector Server
//!
//! Mock collector endpoint for load testing TR-069 / TR-369 bulk data reporting.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use collector::forwarding::{ForwardingConfig, MetricsCollectorService};
use collector::service::{CollectorService, MockCollectorService};
use collector::state::AppState;

/// Where decoded reports go.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Sink {
    /// Count reports per device in memory
    Mock,
    /// Record parameter values as Prometheus series per device
    Metrics,
}

/// Bulk Data Collector
#[derive(Parser, Debug)]
#[command(name = "collector")]
#[command(about = "Bulk data collector accepting ParameterPerRow and NameValuePair reports")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8088", env = "COLLECTOR_LISTEN_ADDR")]
    listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Number of worker threads
    #[arg(long, env = "COLLECTOR_WORKER_THREADS")]
    worker_threads: Option<usize>,

    /// Report sink
    #[arg(long, value_enum, default_value = "mock", env = "COLLECTOR_SINK")]
    sink: Sink,

    /// YAML instrument mapping for the metrics sink (defaults to a gauge per known parameter)
    #[arg(long, env = "COLLECTOR_INSTRUMENTS")]
    instruments: Option<PathBuf>,

    /// Answer 429 while more than this many reports are being processed
    #[arg(long, env = "COLLECTOR_MAX_IN_FLIGHT")]
    max_in_flight: Option<usize>,

    /// Simulated processing time per report, in milliseconds
    #[arg(long, env = "COLLECTOR_PROCESSING_DELAY_MS")]
    processing_delay_ms: Option<u64>,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Build runtime with configured threads
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(run_server(args))
}

async fn run_server(args: Args) -> Result<()> {
    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    info!("Starting bulk data collector");

    let service = build_service(&args)?;
    let state = Arc::new(AppState::new(service).with_prometheus(prometheus_handle));
    let app = collector::router(state);

    let addr: SocketAddr = args
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address: {}", args.listen))?;

    info!("Collector listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server failed")?;

    Ok(())
}

fn build_service(args: &Args) -> Result<Arc<dyn CollectorService>> {
    match args.sink {
        Sink::Mock => {
            let mut service = MockCollectorService::new();
            if let Some(max) = args.max_in_flight {
                info!(max_in_flight = max, "Backpressure enabled");
                service = service.with_max_in_flight(max);
            }
            if let Some(ms) = args.processing_delay_ms {
                service = service.with_processing_delay(Duration::from_millis(ms));
            }
            Ok(Arc::new(service))
        }
        Sink::Metrics => {
            let config = match &args.instruments {
                Some(path) => ForwardingConfig::from_file(path).with_context(|| {
                    format!("Failed to load instruments from {}", path.display())
                })?,
                None => ForwardingConfig::for_example_parameters(),
            };
            config.validate().context("Invalid instrument configuration")?;
            info!(instruments = config.instruments.len(), "Forwarding reports to metrics");
            Ok(Arc::new(MetricsCollectorService::new(&config)))
        }
    }
}
