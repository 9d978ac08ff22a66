//! Load test orchestration.
//!
//! Each worker is one simulated device client: it builds a report, posts it,
//! waits for the response and only then starts the next iteration. Workers
//! share nothing but the connection pool and the metrics sink.

use crate::config::TestConfig;
use crate::generator::ReportGenerator;
use crate::metrics::{MetricsCollector, TestResults};
use crate::sender::{generate_and_send, CollectorClient, Outcome, RequestResult};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{info, warn};

/// A single logged iteration for debugging.
#[derive(Debug, Serialize)]
pub struct RequestLog {
    pub timestamp_ms: u64,
    pub worker: u32,
    pub iteration: u64,
    pub url: String,
    pub serial_number: String,
    pub format: String,
    pub latency_ms: f64,
    pub outcome: Outcome,
}

type SharedLog = Arc<Mutex<BufWriter<File>>>;

/// Executes load tests with a fixed number of sequential workers.
pub struct LoadRunner {
    client: CollectorClient,
    config: TestConfig,
    show_progress: bool,
}

impl LoadRunner {
    /// Create a new load runner.
    pub fn new(config: TestConfig) -> anyhow::Result<Self> {
        let client = CollectorClient::new(
            Duration::from_secs(config.request_timeout_secs),
            config.concurrency as usize,
        )?;

        Ok(Self {
            client,
            config,
            show_progress: true,
        })
    }

    /// Disable the progress bar (tests, piped output).
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Run the load test.
    pub async fn run(&mut self) -> anyhow::Result<TestResults> {
        let interval = self.config.pacing_interval()?;
        let total_duration =
            Duration::from_secs(self.config.duration_secs + self.config.warmup_secs);
        let warmup_duration = Duration::from_secs(self.config.warmup_secs);

        info!(
            scenario = %self.config.name,
            base_url = %self.config.base_url,
            workers = self.config.concurrency,
            format = %self.config.format,
            "Starting load test"
        );
        if self.show_progress {
            println!("Starting load test: {}", self.config.name);
            println!("  Warmup: {}s", self.config.warmup_secs);
            println!("  Test duration: {}s", self.config.duration_secs);
            println!("  Workers: {}", self.config.concurrency);
            if let Some(rps) = self.config.requests_per_second {
                println!("  Rate limit: {:.1} req/s per worker", rps);
            }
            if let Some(cardinality) = self.config.serial_number.cardinality() {
                println!("  Distinct devices: {}", cardinality);
            }
            println!();
        }

        let pb = if self.show_progress {
            let pb = ProgressBar::new(self.config.duration_secs);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len}s {msg}")?
                    .progress_chars("##-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let metrics = Arc::new(Mutex::new(MetricsCollector::new()));
        let request_log = if self.config.log_requests {
            Some(self.open_request_log()?)
        } else {
            None
        };

        let start_time = Instant::now();
        let deadline = start_time + total_duration;

        let mut workers = Vec::with_capacity(self.config.concurrency as usize);
        for worker in 0..self.config.concurrency {
            let ctx = WorkerContext {
                worker,
                generator: ReportGenerator::for_worker(&self.config, worker),
                client: self.client.clone(),
                config: self.config.clone(),
                metrics: metrics.clone(),
                request_log: request_log.clone(),
                start_time,
                warmup_end: start_time + warmup_duration,
                deadline,
                interval,
            };
            workers.push(tokio::spawn(run_worker(ctx)));
        }

        // Progress updates until every worker has stopped
        while workers.iter().any(|w| !w.is_finished()) {
            let elapsed = start_time.elapsed();
            if elapsed < warmup_duration {
                pb.set_message(format!(
                    "Warmup ({}/{}s)",
                    elapsed.as_secs(),
                    self.config.warmup_secs
                ));
            } else if elapsed < total_duration {
                pb.set_message("Test phase");
                let position = (elapsed - warmup_duration).as_secs();
                pb.set_position(position.min(self.config.duration_secs));
            } else {
                pb.set_message("Waiting for in-flight requests...");
            }
            sleep(Duration::from_millis(100)).await;
        }

        for worker in workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "Worker task failed");
            }
        }

        if let Some(log) = &request_log {
            log.lock().await.flush()?;
        }

        pb.finish_with_message("Complete!");
        if self.show_progress {
            println!();
        }

        let m = metrics.lock().await;
        let results = m.results(
            self.config.name.clone(),
            self.config.format.to_string(),
            self.config.concurrency,
            self.config.serial_number.cardinality(),
        );
        info!(
            total = results.total_requests,
            passed = results.passed_requests,
            failed = results.failed_requests,
            "Load test complete"
        );
        Ok(results)
    }

    fn open_request_log(&self) -> anyhow::Result<SharedLog> {
        let results_dir = Path::new(&self.config.results_dir);
        std::fs::create_dir_all(results_dir)?;
        // Include scenario name in filename for easier identification
        let scenario_name = self.config.name.replace(' ', "_").to_lowercase();
        let log_path = results_dir.join(format!(
            "{}_{}.jsonl",
            scenario_name,
            chrono::Utc::now().format("%Y%m%d_%H%M%S")
        ));
        info!(path = %log_path.display(), "Logging requests");
        let file = File::create(&log_path)?;
        Ok(Arc::new(Mutex::new(BufWriter::new(file))))
    }
}

struct WorkerContext {
    worker: u32,
    generator: ReportGenerator,
    client: CollectorClient,
    config: TestConfig,
    metrics: Arc<Mutex<MetricsCollector>>,
    request_log: Option<SharedLog>,
    start_time: Instant,
    warmup_end: Instant,
    deadline: Instant,
    interval: Option<Duration>,
}

async fn run_worker(mut ctx: WorkerContext) {
    let mut iteration = 0u64;

    while Instant::now() < ctx.deadline {
        if ctx.config.max_iterations.is_some_and(|max| iteration >= max) {
            break;
        }

        let iteration_start = Instant::now();
        let format = ctx.config.format.format_for(iteration);
        let result = generate_and_send(&mut ctx.generator, &ctx.client, format).await;

        // Warmup iterations are sent but not counted
        if iteration_start >= ctx.warmup_end {
            ctx.metrics.lock().await.record(&result);
            if let Some(log) = &ctx.request_log {
                write_log(log, ctx.worker, ctx.start_time, iteration, &result).await;
            }
        }

        iteration += 1;

        if let Some(interval) = ctx.interval {
            let spent = iteration_start.elapsed();
            if spent < interval {
                let remaining = ctx.deadline.saturating_duration_since(Instant::now());
                sleep((interval - spent).min(remaining)).await;
            }
        }
    }
}

async fn write_log(
    log: &SharedLog,
    worker: u32,
    start_time: Instant,
    iteration: u64,
    result: &RequestResult,
) {
    let entry = RequestLog {
        timestamp_ms: result.timestamp.duration_since(start_time).as_millis() as u64,
        worker,
        iteration,
        url: result.url.clone(),
        serial_number: result.serial_number.clone(),
        format: result.format.header_value().to_string(),
        latency_ms: result.latency_us as f64 / 1000.0,
        outcome: result.outcome.clone(),
    };
    let mut writer = log.lock().await;
    if let Err(e) = append_entry(&mut *writer, &entry) {
        warn!(error = %e, worker, iteration, "Failed to write request log entry");
    }
}

/// Append one JSON line to the request log.
fn append_entry<W: Write>(writer: &mut W, entry: &RequestLog) -> std::io::Result<()> {
    serde_json::to_writer(&mut *writer, entry)?;
    writer.write_all(b"\n")
}
