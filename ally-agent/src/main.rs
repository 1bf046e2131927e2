//! Ally Agent
//!
//! An accessibility-audit agent that watches for audit jobs and runs them.
//!
//! Architecture:
//! - Configuration: Built from command-line arguments and environment
//! - Repositories: HTTP communication with job servers
//! - Services: Check execution and report delivery
//! - Sources: Queue directory or rotating job servers
//! - Scheduler: Rotation policy, job runner and watch loop
//!
//! Exactly one job is in flight at any time. The agent either watches a
//! local queue directory or polls a shuffled rotation of job servers,
//! backing off to a long idle interval when a full rotation finds nothing.

mod config;
mod error;
mod repository;
mod scheduler;
mod service;
mod source;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::repository::HttpJobServerRepository;
use crate::scheduler::{JobRunner, Repeat, Watcher};
use crate::service::{CheckService, CommandCheckService, ReportService, StandardReportService};
use ally_client::JobServerClient;

#[derive(Parser)]
#[command(name = "ally-agent")]
#[command(about = "Watches for accessibility-audit jobs and runs them", long_about = None)]
struct Cli {
    /// Identifier sent to job servers (random if unset)
    #[arg(long, env = "AGENT")]
    agent: Option<String>,

    /// Queue root directory; pending jobs live in its todo/ subdirectory
    #[arg(long, env = "JOBDIR", default_value = "jobs")]
    job_dir: PathBuf,

    /// Job-server URLs separated by '+'
    #[arg(long, env = "JOB_URLS", default_value = "")]
    job_urls: String,

    /// Directory for reports whose destination is not a URL
    #[arg(long, env = "REPORTDIR")]
    report_dir: Option<PathBuf>,

    /// Command that runs a job's checks
    #[arg(long, env = "CHECK_COMMAND", default_value = "ally-checks")]
    check_command: String,

    /// Itemize findings in check results
    #[arg(long, env = "WITH_ITEMS")]
    with_items: bool,

    /// Request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT", default_value_t = 30)]
    request_timeout: u64,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Watch the queue directory
    Dir {
        /// Seconds between checks; -1 checks once
        #[arg(long, default_value_t = 300, allow_negative_numbers = true)]
        interval: i64,
    },
    /// Poll job servers
    Net {
        /// Keep watching after the first job
        #[arg(long)]
        forever: bool,

        /// Seconds to wait after a full rotation finds no job
        #[arg(long, default_value_t = 300)]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ally_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli);
    config.validate()?;
    info!(
        "Loaded configuration: agent_id={}, job_dir={}",
        config.agent_id,
        config.job_dir.display()
    );

    let client = JobServerClient::with_timeout(config.request_timeout)
        .context("Failed to build HTTP client")?;

    let checks: Arc<dyn CheckService> = Arc::new(CommandCheckService::new(&config.check_command)?);
    let reports: Arc<dyn ReportService> = Arc::new(StandardReportService::new(
        client.clone(),
        config.report_dir.clone(),
    ));
    let runner = JobRunner::new(checks, reports, config.agent_id.clone(), config.with_items);
    let watcher = Watcher::new(config.clone(), runner);

    let summary = match cli.mode {
        Mode::Dir { interval } => watcher.start_directory(Repeat::from_interval(interval)).await,
        Mode::Net { forever, .. } => {
            let repository = HttpJobServerRepository::new(client, config.agent_id.clone());
            watcher.start_network(repository, forever).await?
        }
    };

    info!(
        "Watching ended: {} poll(s), {} job(s) run, {} failed",
        summary.polls, summary.jobs_run, summary.jobs_failed
    );

    Ok(())
}

/// Builds the session configuration from command-line arguments
fn build_config(cli: &Cli) -> Config {
    let agent_id = cli
        .agent
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let mut config = Config::new(agent_id, cli.job_dir.clone()).with_job_urls(&cli.job_urls);
    if let Some(report_dir) = &cli.report_dir {
        config.report_dir = report_dir.clone();
    }
    config.check_command = cli
        .check_command
        .split_whitespace()
        .map(str::to_string)
        .collect();
    config.with_items = cli.with_items;
    config.request_timeout = Duration::from_secs(cli.request_timeout);
    if let Mode::Net { interval, .. } = cli.mode {
        config.idle_interval = Duration::from_secs(interval);
    }
    config
}
