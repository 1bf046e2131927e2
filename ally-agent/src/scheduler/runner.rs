//! Job runner
//!
//! Drives one job end to end: run its checks, deliver the report, then have
//! the source acknowledge it. A failure at any stage ends the job and is
//! logged here; nothing propagates to the watcher and nothing is retried.

use ally_core::domain::job::Job;
use ally_core::domain::report::Report;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::AgentError;
use crate::service::{CheckService, ReportService};
use crate::source::JobSource;

/// What became of one job
#[derive(Debug)]
pub enum JobOutcome {
    /// Checked, reported and archived
    Completed,
    /// Abandoned at the stage the error names
    Failed(AgentError),
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Runs jobs against the check and report capabilities
pub struct JobRunner {
    checks: Arc<dyn CheckService>,
    reports: Arc<dyn ReportService>,
    agent_id: String,
    with_items: bool,
}

impl JobRunner {
    /// Creates a job runner
    ///
    /// # Arguments
    /// * `checks` - Check execution capability
    /// * `reports` - Report delivery capability
    /// * `agent_id` - Recorded in every report
    /// * `with_items` - Ask checks to itemize findings
    pub fn new(
        checks: Arc<dyn CheckService>,
        reports: Arc<dyn ReportService>,
        agent_id: String,
        with_items: bool,
    ) -> Self {
        Self {
            checks,
            reports,
            agent_id,
            with_items,
        }
    }

    /// Runs one job to completion or failure
    pub async fn run(&self, job: &Job, source: &mut dyn JobSource) -> JobOutcome {
        match self.execute(job, source).await {
            Ok(()) => {
                info!("Job {} finished", job.id);
                JobOutcome::Completed
            }
            Err(e) => {
                error!("Failed processing job {}: {}", job.id, e);
                source.abandon(job).await;
                JobOutcome::Failed(e)
            }
        }
    }

    async fn execute(&self, job: &Job, source: &mut dyn JobSource) -> Result<(), AgentError> {
        let started_at = Utc::now();
        info!("Running checks for job {}", job.id);

        let results = self
            .checks
            .run_checks(job, self.with_items)
            .await
            .map_err(|e| AgentError::CheckExecution {
                job_id: job.id.clone(),
                message: format!("{:#}", e),
            })?;

        let report = Report::new(job, &self.agent_id, started_at, results);
        self.reports
            .deliver(job.report_destination(), &report)
            .await
            .map_err(|e| AgentError::ReportDelivery {
                job_id: job.id.clone(),
                message: format!("{:#}", e),
            })?;
        info!("Report for job {} sent to {}", job.id, job.report_destination());

        source.archive(job).await
    }
}
