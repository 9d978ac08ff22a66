//! Load test CLI for bulk data collectors.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "load-test")]
#[command(about = "Load testing tool for TR-069/USP bulk data collectors", long_about = None)]
struct Cli {
    /// Log level for diagnostics on stderr
    #[arg(long, global = true, default_value = "warn", env = "RUST_LOG")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a load test from a scenario file
    Run {
        /// Path to scenario YAML file
        #[arg(short, long)]
        scenario: PathBuf,

        /// Override number of simulated devices
        #[arg(short, long)]
        concurrency: Option<u32>,

        /// Override test duration in seconds
        #[arg(short, long)]
        duration: Option<u64>,

        /// Override collector base URL
        #[arg(short, long, env = "COLLECTOR_URL")]
        url: Option<String>,

        /// Override report format: csv, json or alternate
        #[arg(short, long)]
        format: Option<load_test::FormatSelection>,

        /// Output format: table (default), json, csv
        #[arg(short, long, default_value = "table")]
        output: String,
    },

    /// Run a quick smoke test
    Quick {
        /// Report format: csv, json or alternate
        #[arg(short, long, default_value = "csv")]
        format: load_test::FormatSelection,

        /// Number of requests
        #[arg(short, long, default_value = "100")]
        requests: u64,

        /// Base URL
        #[arg(short, long, default_value = "http://localhost:8088", env = "COLLECTOR_URL")]
        url: String,
    },

    /// List available scenarios
    List {
        /// Scenarios directory
        #[arg(short, long, default_value = "scenarios")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            concurrency,
            duration,
            url,
            format,
            output,
        } => {
            println!("Loading scenario: {}", scenario.display());

            // Load and validate configuration
            let mut config = load_test::TestConfig::from_file(&scenario)?;

            // Apply overrides
            if let Some(c) = concurrency {
                config.concurrency = c;
            }
            if let Some(d) = duration {
                config.duration_secs = d;
            }
            if let Some(u) = url {
                config.base_url = u;
            }
            if let Some(f) = format {
                config.format = f;
            }

            config.validate()?;

            println!("✓ Configuration loaded successfully");
            println!("  Name: {}", config.name);
            println!("  Description: {}", config.description);
            println!("  Collector: {}", config.base_url);
            println!("  Format: {}", config.format);
            println!();

            let mut runner = load_test::LoadRunner::new(config)?;
            let results = runner.run().await?;

            match output.as_str() {
                "json" => {
                    println!("{}", load_test::ResultsReport::format_json(&results)?);
                }
                "csv" => {
                    println!("{}", load_test::ResultsReport::csv_header());
                    println!("{}", load_test::ResultsReport::format_csv(&results));
                }
                _ => {
                    println!("{}", load_test::ResultsReport::format_table(&results));
                }
            }

            Ok(())
        }
        Commands::Quick {
            format,
            requests,
            url,
        } => {
            println!("Running quick test:");
            println!("  Format: {}", format);
            println!("  Requests: {}", requests);
            println!("  URL: {}", url);
            println!();

            // Generous deadline; the iteration cap ends the run
            let config = load_test::TestConfig {
                name: "quick".to_string(),
                description: "Quick smoke test".to_string(),
                base_url: url,
                duration_secs: requests.max(30),
                max_iterations: Some(requests.max(1)),
                format,
                ..load_test::TestConfig::default()
            };
            config.validate()?;

            let mut runner = load_test::LoadRunner::new(config)?;
            let results = runner.run().await?;

            println!("{}", load_test::ResultsReport::format_table(&results));

            Ok(())
        }
        Commands::List { dir } => {
            println!("Available scenarios in {}:", dir.display());
            println!();

            match std::fs::read_dir(&dir) {
                Ok(entries) => {
                    let mut scenarios = Vec::new();

                    for entry in entries.flatten() {
                        let path = entry.path();
                        if path.extension().and_then(|s| s.to_str()) != Some("yaml") {
                            continue;
                        }
                        // Try to load the config to get name and description
                        if let Ok(config) = load_test::TestConfig::from_file(&path) {
                            let filename = path
                                .file_name()
                                .map(|f| f.to_string_lossy().to_string())
                                .unwrap_or_default();
                            scenarios.push((filename, config.name, config.description));
                        }
                    }

                    scenarios.sort_by(|a, b| a.0.cmp(&b.0));

                    if scenarios.is_empty() {
                        println!("No scenario files found");
                    } else {
                        for (filename, name, desc) in scenarios {
                            println!("  {} - {}", filename, name);
                            println!("    {}", desc);
                            println!();
                        }
                    }
                }
                Err(e) => {
                    eprintln!("Error reading directory: {}", e);
                    eprintln!("Make sure the directory exists and is readable");
                }
            }

            Ok(())
        }
    }
}
