//! Report delivery service
//!
//! Delivers a finished report to the destination its job names: HTTP(S)
//! destinations receive the report as a POST, anything else is treated as a
//! local destination and the report is written to the report directory.

use ally_client::JobServerClient;
use ally_core::domain::report::Report;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Service trait for delivering reports
#[async_trait]
pub trait ReportService: Send + Sync {
    /// Delivers a report
    ///
    /// # Arguments
    /// * `destination` - The job's `sendReportTo`
    /// * `report` - The report to deliver
    async fn deliver(&self, destination: &str, report: &Report) -> Result<()>;
}

/// Standard implementation of ReportService
pub struct StandardReportService {
    client: JobServerClient,
    report_dir: PathBuf,
}

impl StandardReportService {
    /// Creates a new report service
    ///
    /// # Arguments
    /// * `client` - Client used for HTTP destinations
    /// * `report_dir` - Directory for reports with a local destination
    pub fn new(client: JobServerClient, report_dir: PathBuf) -> Self {
        Self { client, report_dir }
    }

    async fn write_report(&self, report: &Report) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.report_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.report_dir.display()))?;

        let path = report_path(&self.report_dir, &report.job_id);
        let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(path)
    }
}

#[async_trait]
impl ReportService for StandardReportService {
    async fn deliver(&self, destination: &str, report: &Report) -> Result<()> {
        if is_http(destination) {
            self.client
                .deliver_report(destination, report)
                .await
                .with_context(|| format!("Failed to post report to {}", destination))?;
            debug!("Posted report for job {} to {}", report.job_id, destination);
        } else {
            let path = self.write_report(report).await?;
            debug!(
                "Wrote report for job {} to {}",
                report.job_id,
                path.display()
            );
        }
        Ok(())
    }
}

fn is_http(destination: &str) -> bool {
    destination.starts_with("http://") || destination.starts_with("https://")
}

fn report_path(dir: &Path, job_id: &str) -> PathBuf {
    let name: String = job_id
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    dir.join(format!("{}.json", name))
}
