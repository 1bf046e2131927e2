//! Job domain types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// An accessibility-audit job
///
/// Only `id` and `sources.sendReportTo` are interpreted by the agent. Every
/// other field is the check specification and is carried through untouched
/// to the check capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub sources: JobSources,
    #[serde(flatten)]
    pub spec: Map<String, JsonValue>,
}

/// Where a job came from and where its report goes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSources {
    #[serde(rename = "sendReportTo")]
    pub send_report_to: String,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Job {
    /// Creates a job with an empty check specification
    pub fn new(id: impl Into<String>, send_report_to: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sources: JobSources {
                send_report_to: send_report_to.into(),
                extra: Map::new(),
            },
            spec: Map::new(),
        }
    }

    /// Destination the report of this job is delivered to
    pub fn report_destination(&self) -> &str {
        &self.sources.send_report_to
    }
}
