//! Job-server endpoints

use crate::JobServerClient;
use crate::error::Result;
use ally_core::dto::job::InvalidPayloadNotice;

impl JobServerClient {
    /// Ask a job server for a job on behalf of an agent
    ///
    /// # Arguments
    /// * `endpoint` - The job server URL
    /// * `agent` - Identifier of the requesting agent, sent as `?agent=`
    ///
    /// # Returns
    /// The raw response body, to be classified by the caller
    pub async fn request_job(&self, endpoint: &str, agent: &str) -> Result<String> {
        let response = self
            .client
            .get(endpoint)
            .query(&[("agent", agent)])
            .send()
            .await?;

        self.handle_job_response(response).await
    }

    /// Tell a job server that its last payload was malformed
    ///
    /// # Arguments
    /// * `endpoint` - The job server that sent the payload
    /// * `agent` - Identifier of the reporting agent
    /// * `message` - What was wrong with the payload
    pub async fn report_invalid(&self, endpoint: &str, agent: &str, message: &str) -> Result<()> {
        let response = self
            .client
            .post(endpoint)
            .query(&[("agent", agent)])
            .json(&InvalidPayloadNotice {
                agent: agent.to_string(),
                message: message.to_string(),
            })
            .send()
            .await?;

        self.handle_empty_response(response).await
    }
}
