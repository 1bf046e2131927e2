//! Job sources
//!
//! A job source answers "is there a job?" one poll at a time and, once a job
//! it produced has completed, acknowledges it. Two sources exist:
//! - `DirectorySource`: JSON job files in a local queue directory
//! - `NetworkSource`: a rotation over remote job servers

mod directory;
mod network;

pub use directory::DirectorySource;
pub use network::NetworkSource;

use ally_core::domain::job::Job;
use ally_core::dto::job::PollOutcome;
use async_trait::async_trait;

use crate::error::AgentError;

/// Trait for anything the watcher can poll for jobs
#[async_trait]
pub trait JobSource: Send {
    /// Human-readable name of the source, for logs
    fn describe(&self) -> String;

    /// Checks the source once
    ///
    /// A job returned here is never returned again by the same source.
    async fn poll(&mut self) -> Result<PollOutcome, AgentError>;

    /// Acknowledges a completed job
    ///
    /// Called only after the job's report has been delivered.
    async fn archive(&mut self, job: &Job) -> Result<(), AgentError>;

    /// Gives up on a job that failed at any stage
    ///
    /// The job is not retried; the source only drops its bookkeeping.
    async fn abandon(&mut self, _job: &Job) {}
}
