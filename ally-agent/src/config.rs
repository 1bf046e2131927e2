//! Agent configuration
//!
//! Defines every configurable parameter of a watch session: where jobs come
//! from, how the agent identifies itself, how checks run and where reports go,
//! and the polling intervals.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::AgentError;

/// Agent configuration
///
/// Built once at startup and passed into the watcher; nothing in the agent
/// reads process environment after this point.
#[derive(Debug, Clone)]
pub struct Config {
    /// Identifier sent to job servers as `?agent=`
    pub agent_id: String,

    /// Queue root; pending jobs live in `<job_dir>/todo`
    pub job_dir: PathBuf,

    /// Candidate job-server URLs
    pub job_urls: Vec<String>,

    /// Where reports with a non-URL destination are written
    pub report_dir: PathBuf,

    /// Command that runs a job's checks (program followed by arguments)
    pub check_command: Vec<String>,

    /// Whether check results should itemize findings, not just total them
    pub with_items: bool,

    /// Wait after a full rotation found no job anywhere
    pub idle_interval: Duration,

    /// Wait between polls while a rotation is still in progress
    pub server_delay: Duration,

    /// Per-request timeout for job servers and report destinations
    pub request_timeout: Duration,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(agent_id: String, job_dir: PathBuf) -> Self {
        let report_dir = job_dir.join("reports");
        Self {
            agent_id,
            job_dir,
            job_urls: Vec::new(),
            report_dir,
            check_command: vec!["ally-checks".to_string()],
            with_items: false,
            idle_interval: Duration::from_secs(300),
            server_delay: Duration::from_secs(2),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Sets the job-server URLs from a `+`-separated list
    pub fn with_job_urls(mut self, raw: &str) -> Self {
        self.job_urls = parse_job_urls(raw);
        self
    }

    /// Pending-job directory
    pub fn todo_dir(&self) -> PathBuf {
        self.job_dir.join("todo")
    }

    /// Archive directory for completed jobs
    pub fn done_dir(&self) -> PathBuf {
        self.job_dir.join("done")
    }

    /// Validates the job-server list and returns it
    ///
    /// The list must be non-empty and every entry must be a well-formed
    /// `http://` or `https://` URL.
    pub fn endpoints(&self) -> Result<Vec<String>, AgentError> {
        if self.job_urls.is_empty() {
            return Err(AgentError::Configuration(
                "list of job URLs is empty".to_string(),
            ));
        }

        for url in &self.job_urls {
            let parsed = reqwest::Url::parse(url).map_err(|e| {
                AgentError::Configuration(format!("job URL {:?} is malformed: {}", url, e))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(AgentError::Configuration(format!(
                    "job URL {:?} must start with http:// or https://",
                    url
                )));
            }
        }

        Ok(self.job_urls.clone())
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.agent_id.is_empty() {
            anyhow::bail!("agent_id cannot be empty");
        }

        if self.check_command.is_empty() {
            anyhow::bail!("check_command cannot be empty");
        }

        if self.server_delay.is_zero() {
            anyhow::bail!("server_delay must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), PathBuf::from("jobs"))
    }
}

/// Splits a `+`-separated job-server list
pub fn parse_job_urls(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    raw.split('+').map(|url| url.trim().to_string()).collect()
}
