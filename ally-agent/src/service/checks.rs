//! Check execution service
//!
//! Runs a job's accessibility checks. The checks themselves (label clashes,
//! menu keyboard navigation, links without destinations, ...) live outside
//! the agent; this service only hands them a job and collects their results.

use ally_core::domain::job::Job;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Service trait for running a job's checks
#[async_trait]
pub trait CheckService: Send + Sync {
    /// Runs every check the job asks for
    ///
    /// # Arguments
    /// * `job` - The job, including its check specification
    /// * `with_items` - Itemize findings instead of only totalling them
    ///
    /// # Returns
    /// The structured check results
    async fn run_checks(&self, job: &Job, with_items: bool) -> Result<JsonValue>;
}

/// Runs checks by spawning an external command
///
/// The job is written to the command's stdin as JSON and the command prints
/// its results to stdout as JSON. `--with-items` is appended when findings
/// should be itemized.
pub struct CommandCheckService {
    program: String,
    args: Vec<String>,
}

impl CommandCheckService {
    /// Creates a service from a command line (program followed by arguments)
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .context("Check command cannot be empty")?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl CheckService for CommandCheckService {
    async fn run_checks(&self, job: &Job, with_items: bool) -> Result<JsonValue> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if with_items {
            command.arg("--with-items");
        }

        debug!("Spawning check command {} for job {}", self.program, job.id);

        let mut child = command
            .spawn()
            .with_context(|| format!("Failed to spawn check command '{}'", self.program))?;

        let input = serde_json::to_vec(job).context("Failed to serialize job")?;
        let stdin = child.stdin.take();
        // Feed stdin while stdout is drained; stdin closes when this finishes
        let feed = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            match stdin.write_all(&input).await {
                Err(e) if e.kind() != ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            }
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.context("Failed to wait for check command")?;
        fed.context("Failed to write job to check command")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "Check command exited with {}: {}",
                output.status,
                stderr.trim()
            );
        }

        serde_json::from_slice(&output.stdout).context("Check command printed malformed results")
    }
}
