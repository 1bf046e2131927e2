//! Report delivery

use crate::JobServerClient;
use crate::error::{ClientError, Result};
use ally_core::domain::report::Report;

impl JobServerClient {
    /// Deliver a finished report to an HTTP destination
    ///
    /// # Arguments
    /// * `destination` - The `sendReportTo` URL of the job
    /// * `report` - The report to post as JSON
    pub async fn deliver_report(&self, destination: &str, report: &Report) -> Result<()> {
        if !destination.starts_with("http://") && !destination.starts_with("https://") {
            return Err(ClientError::InvalidRequest(format!(
                "report destination {} is not an HTTP URL",
                destination
            )));
        }

        let response = self.client.post(destination).json(report).send().await?;

        self.handle_empty_response(response).await
    }
}
