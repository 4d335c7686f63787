mod metrics;
mod state;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use discofetch_core::{load_config_or_default, validate_config, JobFilter, OriginContext};

use state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Command-line arguments for discofetch
#[derive(Parser, Debug)]
#[command(name = "discofetch")]
#[command(about = "Queue album downloads for every release of an artist")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "discofetch.toml", env = "DISCOFETCH_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Queue one job per matching release of an artist
    Artist {
        /// Artist link on the catalog site
        url: String,
        /// Comma-separated release types (album, single, compilation, appears_on)
        #[arg(short, long)]
        types: Option<String>,
        /// Print metrics in Prometheus text format after the run
        #[arg(long)]
        print_metrics: bool,
    },
    /// Show the status of a job
    Status { job_id: String },
    /// List jobs
    Jobs {
        /// Only jobs in this state (queued, processing, complete, error, duplicate)
        #[arg(short, long)]
        status: Option<String>,
        #[arg(short, long, default_value_t = 50)]
        limit: i64,
    },
    /// Claim the oldest queued job
    Claim,
    /// Mark a processing job complete
    Complete { job_id: String },
    /// Mark a job failed
    Fail {
        job_id: String,
        #[arg(short, long)]
        message: String,
    },
    /// Delete finished jobs
    Purge {
        /// Only jobs last updated at least this many hours ago
        #[arg(long, default_value_t = 24)]
        older_than_hours: i64,
    },
    /// Print the effective configuration (secrets redacted)
    Config,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    info!("discofetch {} loading configuration from {:?}", VERSION, cli.config);
    let config = load_config_or_default(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;
    info!("Database path: {:?}", config.queue.database_path);

    let state = AppState::new(config)?;

    let output = execute(&state, cli.command).await?;
    println!("{}", output);

    Ok(())
}

/// Run one command and return what should be printed.
async fn execute(state: &AppState, command: Command) -> Result<String> {
    match command {
        Command::Artist {
            url,
            types,
            print_metrics,
        } => {
            let origin = OriginContext::new().with("client", "cli");
            let outcome = state
                .downloader()
                .download_artist_releases(&url, types.as_deref(), &origin)
                .await
                .with_context(|| format!("Artist download failed for {}", url))?;

            let mut output = serde_json::to_string_pretty(&outcome)?;
            if print_metrics {
                output.push('\n');
                output.push_str(&metrics::encode_metrics());
            }
            Ok(output)
        }
        Command::Status { job_id } => {
            let job = state.queue().status_of(&job_id)?;
            Ok(serde_json::to_string_pretty(&job.status_view())?)
        }
        Command::Jobs { status, limit } => {
            if limit <= 0 {
                bail!("--limit must be positive");
            }
            let mut filter = JobFilter::new().with_limit(limit);
            if let Some(status) = status {
                filter = filter.with_state(status);
            }
            let jobs = state.queue().list(&filter)?;
            Ok(serde_json::to_string_pretty(&jobs)?)
        }
        Command::Claim => {
            let job = state.queue().claim_next()?;
            Ok(serde_json::to_string_pretty(&job)?)
        }
        Command::Complete { job_id } => {
            let job = state.queue().complete(&job_id)?;
            Ok(serde_json::to_string_pretty(&job.status_view())?)
        }
        Command::Fail { job_id, message } => {
            let job = state.queue().fail(&job_id, message)?;
            Ok(serde_json::to_string_pretty(&job.status_view())?)
        }
        Command::Purge { older_than_hours } => {
            if older_than_hours < 0 {
                bail!("--older-than-hours cannot be negative");
            }
            let purged = state
                .queue()
                .purge_terminal(chrono::Duration::hours(older_than_hours))?;
            Ok(format!("Purged {} jobs", purged))
        }
        Command::Config => Ok(serde_json::to_string_pretty(&state.sanitized_config())?),
    }
}
