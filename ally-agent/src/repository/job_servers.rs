//! Job servers repository
//!
//! Handles communication with remote job servers:
//! - Requesting a job for this agent
//! - Reporting a malformed payload back to the server that sent it

use ally_client::{ClientError, JobServerClient};
use async_trait::async_trait;

/// Repository trait for job-server operations
#[async_trait]
pub trait JobServerRepository: Send + Sync {
    /// Requests a job from one server
    ///
    /// # Arguments
    /// * `endpoint` - The server URL
    ///
    /// # Returns
    /// The raw response body
    async fn request_job(&self, endpoint: &str) -> Result<String, ClientError>;

    /// Tells a server its last payload was malformed
    ///
    /// # Arguments
    /// * `endpoint` - The server URL
    /// * `message` - What was wrong with the payload
    async fn report_invalid(&self, endpoint: &str, message: &str) -> Result<(), ClientError>;
}

/// HTTP implementation of JobServerRepository
pub struct HttpJobServerRepository {
    client: JobServerClient,
    agent_id: String,
}

impl HttpJobServerRepository {
    /// Creates a new HTTP job-server repository
    ///
    /// # Arguments
    /// * `client` - Shared job-server client
    /// * `agent_id` - Identifier sent with every request
    pub fn new(client: JobServerClient, agent_id: String) -> Self {
        Self { client, agent_id }
    }
}

#[async_trait]
impl JobServerRepository for HttpJobServerRepository {
    async fn request_job(&self, endpoint: &str) -> Result<String, ClientError> {
        self.client.request_job(endpoint, &self.agent_id).await
    }

    async fn report_invalid(&self, endpoint: &str, message: &str) -> Result<(), ClientError> {
        self.client
            .report_invalid(endpoint, &self.agent_id, message)
            .await
    }
}
