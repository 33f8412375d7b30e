//! Job status types.

use serde::{Deserialize, Serialize};

use crate::models::JobResponse;

/// Position of a job in its lifecycle.
///
/// ```text
/// Queued -> Downloading -> Probing -> Building -> Rendering -> Verifying -> Complete
///                  \__________\__________\___________\____________\--------> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JobPhase {
    #[default]
    Queued,
    /// Request is being checked; no I/O has happened yet.
    Validating,
    Downloading,
    Probing,
    Building,
    Rendering,
    Verifying,
    Complete,
    Failed,
}

impl JobPhase {
    /// Name used in logs and failure responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "Queued",
            Self::Validating => "Validating",
            Self::Downloading => "Downloading",
            Self::Probing => "Probing",
            Self::Building => "Building",
            Self::Rendering => "Rendering",
            Self::Verifying => "Verifying",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Whether no further transition can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the store knows about one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusRecord {
    pub job_id: String,
    pub phase: JobPhase,
    /// RFC 3339 timestamp of the last update.
    pub updated_at: String,
    /// Stage that failed, when `phase` is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Final response once the job is terminal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<JobResponse>,
}

impl JobStatusRecord {
    /// A freshly queued job.
    pub fn queued(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            phase: JobPhase::Queued,
            updated_at: now(),
            failed_stage: None,
            error: None,
            response: None,
        }
    }

    /// Move to `phase`, refreshing the timestamp.
    pub fn advance(mut self, phase: JobPhase) -> Self {
        self.phase = phase;
        self.updated_at = now();
        self
    }

    /// Terminal record for a finished job.
    pub fn finished(response: JobResponse) -> Self {
        let mut record = Self::queued(response.job_id());
        match &response {
            JobResponse::Success { .. } => record.phase = JobPhase::Complete,
            JobResponse::Failure { error, stage, .. } => {
                record.phase = JobPhase::Failed;
                record.failed_stage = Some(stage.clone());
                record.error = Some(error.clone());
            }
        }
        record.response = Some(response);
        record
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
