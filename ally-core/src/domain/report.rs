//! Report domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::job::Job;

/// Output of running one job's checks
///
/// Owned transiently by the agent: built after the checks finish, handed to
/// the reporting capability, then dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub job_id: String,
    pub agent: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub job: Job,
    /// Check results exactly as the check capability produced them
    pub results: JsonValue,
}

impl Report {
    /// Builds a report for a job whose checks started at `started_at`
    pub fn new(job: &Job, agent: &str, started_at: DateTime<Utc>, results: JsonValue) -> Self {
        Self {
            job_id: job.id.clone(),
            agent: agent.to_string(),
            started_at,
            finished_at: Utc::now(),
            job: job.clone(),
            results,
        }
    }
}
