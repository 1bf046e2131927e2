//! Job-server DTOs

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::job::Job;

/// Typed outcome of asking one job source for work
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The source has nothing to do, optionally saying why
    NoJob(Option<String>),
    /// A well-formed job addressed to a report destination
    JobFound(Job),
    /// The source answered with something that is neither a message nor a job
    InvalidResponse(String),
}

impl PollOutcome {
    /// Classifies a raw job-server response body
    ///
    /// A non-empty `message` means no job. Otherwise the body must carry both
    /// `id` and `sources`, and `sources.sendReportTo` must be set, for it to be
    /// a job. Anything else is invalid.
    pub fn classify(body: &str) -> Self {
        let value: JsonValue = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(e) => return Self::InvalidResponse(format!("unparseable response: {}", e)),
        };

        let Some(object) = value.as_object() else {
            return Self::InvalidResponse("response is not a JSON object".to_string());
        };

        if let Some(message) = object.get("message").filter(|m| is_truthy(m)) {
            let message = match message {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Self::NoJob(Some(message));
        }

        let has_id = object.get("id").is_some_and(is_truthy);
        let sources = object.get("sources").filter(|s| is_truthy(s));
        let Some(sources) = sources.filter(|_| has_id) else {
            return Self::InvalidResponse("invalid response".to_string());
        };

        if !sources.get("sendReportTo").is_some_and(is_truthy) {
            return Self::InvalidResponse("job with no report destination".to_string());
        }

        match serde_json::from_value::<Job>(value) {
            Ok(job) => Self::JobFound(job),
            Err(e) => Self::InvalidResponse(format!("malformed job: {}", e)),
        }
    }

    /// Whether this outcome carries a job
    pub fn is_job(&self) -> bool {
        matches!(self, Self::JobFound(_))
    }
}

/// Notice posted back to a job server that sent a malformed payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidPayloadNotice {
    pub agent: String,
    pub message: String,
}

fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}
