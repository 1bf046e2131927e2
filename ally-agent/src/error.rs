//! Agent error kinds
//!
//! Every failure the agent can meet while acquiring and running jobs. Only
//! `Configuration` ends a watch session; the rest are logged where they occur
//! and the watch continues.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// Queue directory could not be listed or read
    #[error("cannot read job directory {path}: {source}")]
    SourceRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A job file did not decode into a job
    #[error("cannot parse job file {path}: {message}")]
    JobParse { path: String, message: String },

    /// A job server answered with neither a message nor a valid job
    #[error("invalid response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },

    /// A job server could not be reached
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: ally_client::ClientError,
    },

    #[error("checks failed for job {job_id}: {message}")]
    CheckExecution { job_id: String, message: String },

    #[error("report for job {job_id} not delivered: {message}")]
    ReportDelivery { job_id: String, message: String },

    #[error("job {job_id} not archived: {message}")]
    Archive { job_id: String, message: String },

    /// Unusable configuration; aborts the session before any poll
    #[error("configuration error: {0}")]
    Configuration(String),
}
