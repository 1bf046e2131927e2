//! Ally HTTP Client
//!
//! A small HTTP client for the network job protocol spoken between the
//! accessibility-audit agent and its job servers:
//! - Requesting a job from a server (`GET <endpoint>?agent=<id>`)
//! - Posting a notice back to a server that sent a malformed payload
//! - Delivering a finished report to an HTTP destination
//!
//! # Example
//!
//! ```no_run
//! use ally_client::JobServerClient;
//! use ally_core::dto::job::PollOutcome;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ally_client::ClientError> {
//!     let client = JobServerClient::new();
//!     let body = client.request_job("https://jobs.example.org/api/job", "agent-1").await?;
//!     match PollOutcome::classify(&body) {
//!         PollOutcome::JobFound(job) => println!("got job {}", job.id),
//!         other => println!("no job: {:?}", other),
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
mod jobs;
mod reports;

pub use error::{ClientError, Result};

use reqwest::Client;
use std::time::Duration;

/// Longest response excerpt carried in an error
const MAX_ERROR_BODY: usize = 1000;

/// HTTP client for job servers and report destinations
///
/// Unlike a single-service client this one holds no base URL: the agent
/// rotates across many servers, so every call names its endpoint.
#[derive(Debug, Clone, Default)]
pub struct JobServerClient {
    /// HTTP client instance
    client: Client,
}

impl JobServerClient {
    /// Create a new client with reqwest defaults
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Create a client whose requests give up after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure proxies, TLS settings, etc.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Read a job-server response body
    ///
    /// Job servers answer with JSON even on some error statuses, so a non-2xx
    /// response whose body is a JSON object is handed back for classification.
    /// Any other non-2xx response becomes an API error.
    async fn handle_job_response(&self, response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() || looks_like_json_object(&body) {
            return Ok(body);
        }

        Err(ClientError::api_error(status.as_u16(), excerpt(&body)))
    }

    /// Handle a response whose body is not needed
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), excerpt(&error_text)));
        }

        Ok(())
    }
}

fn looks_like_json_object(body: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(body).is_ok_and(|v| v.is_object())
}

fn excerpt(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY).collect()
}
