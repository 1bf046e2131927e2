//! Network job source
//!
//! Polls remote job servers one at a time, in rotation order. Each poll goes
//! to the server at the rotation cursor and moves the cursor on, whatever the
//! server answers.

use ally_core::domain::job::Job;
use ally_core::dto::job::PollOutcome;
use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::JobSource;
use crate::error::AgentError;
use crate::repository::JobServerRepository;
use crate::scheduler::Rotation;

/// Longest slice of a malformed body that gets logged
const MAX_LOGGED_BODY: usize = 1000;

/// Job source backed by a rotation of job servers
pub struct NetworkSource<R> {
    repository: R,
    rotation: Rotation,
}

impl<R: JobServerRepository> NetworkSource<R> {
    /// Creates a network source
    ///
    /// # Arguments
    /// * `repository` - Transport to the job servers
    /// * `rotation` - Server order and no-job bookkeeping
    pub fn new(repository: R, rotation: Rotation) -> Self {
        Self {
            repository,
            rotation,
        }
    }

    pub fn rotation(&self) -> &Rotation {
        &self.rotation
    }

    pub fn rotation_mut(&mut self) -> &mut Rotation {
        &mut self.rotation
    }

    /// Logs a malformed payload and tells the server about it
    async fn reject(&self, endpoint: &str, reason: &str, body: &str) {
        let err = AgentError::InvalidResponse {
            endpoint: endpoint.to_string(),
            message: reason.to_string(),
        };
        let excerpt: String = body.chars().take(MAX_LOGGED_BODY).collect();
        error!("{} (response: {})", err, excerpt);

        if let Err(e) = self.repository.report_invalid(endpoint, reason).await {
            warn!("Could not report invalid payload to {}: {}", endpoint, e);
        }
    }
}

#[async_trait]
impl<R: JobServerRepository> JobSource for NetworkSource<R> {
    fn describe(&self) -> String {
        format!("{} job server(s)", self.rotation.endpoints().len())
    }

    async fn poll(&mut self) -> Result<PollOutcome, AgentError> {
        let endpoint = self.rotation.advance().to_string();

        let body = match self.repository.request_job(&endpoint).await {
            Ok(body) => body,
            Err(source) => {
                let err = AgentError::Transport {
                    endpoint: endpoint.clone(),
                    source,
                };
                error!("{}", err);
                self.rotation.record_no_job();
                return Ok(PollOutcome::InvalidResponse(err.to_string()));
            }
        };

        let outcome = PollOutcome::classify(&body);
        match &outcome {
            PollOutcome::NoJob(message) => {
                info!(
                    "Requested job from server {} and got {}",
                    endpoint,
                    message.as_deref().unwrap_or("no job")
                );
                self.rotation.record_no_job();
            }
            PollOutcome::JobFound(job) => {
                info!(
                    "Requested job from server {} and got job {} for {}",
                    endpoint,
                    job.id,
                    job.report_destination()
                );
            }
            PollOutcome::InvalidResponse(reason) => {
                self.reject(&endpoint, reason, &body).await;
                self.rotation.record_no_job();
            }
        }

        Ok(outcome)
    }

    async fn archive(&mut self, job: &Job) -> Result<(), AgentError> {
        // Retrieval is the acknowledgment; the server keeps its own books.
        debug!("Job {} needs no archiving", job.id);
        Ok(())
    }
}
