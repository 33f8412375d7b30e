//! Outbound job result payloads.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Download locations of the rendered variants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Downloads {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub with_overlay: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub without_overlay: Option<PathBuf>,
}

/// Statistics of the primary rendered output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderStats {
    pub duration_seconds: f64,
    pub file_size_bytes: u64,
}

/// Response sent back for a job, success or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobResponse {
    Success {
        success: bool,
        #[serde(rename = "jobId")]
        job_id: String,
        downloads: Downloads,
        stats: RenderStats,
    },
    Failure {
        success: bool,
        #[serde(rename = "jobId")]
        job_id: String,
        error: String,
        /// Name of the stage that failed.
        stage: String,
    },
}

impl JobResponse {
    /// Build a success response.
    pub fn success(job_id: impl Into<String>, downloads: Downloads, stats: RenderStats) -> Self {
        JobResponse::Success {
            success: true,
            job_id: job_id.into(),
            downloads,
            stats,
        }
    }

    /// Build a failure response.
    pub fn failure(
        job_id: impl Into<String>,
        stage: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        JobResponse::Failure {
            success: false,
            job_id: job_id.into(),
            error: error.into(),
            stage: stage.into(),
        }
    }

    /// Whether the job succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, JobResponse::Success { .. })
    }

    /// The job id.
    pub fn job_id(&self) -> &str {
        match self {
            JobResponse::Success { job_id, .. } | JobResponse::Failure { job_id, .. } => job_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_serializes_wire_shape() {
        let response = JobResponse::success(
            "job-1",
            Downloads {
                with_overlay: Some(PathBuf::from("/out/job-1/with_overlay.mp4")),
                without_overlay: None,
            },
            RenderStats {
                duration_seconds: 15.0,
                file_size_bytes: 1024,
            },
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["jobId"], "job-1");
        assert_eq!(json["downloads"]["withOverlay"], "/out/job-1/with_overlay.mp4");
        assert!(json["downloads"].get("withoutOverlay").is_none());
        assert_eq!(json["stats"]["fileSizeBytes"], 1024);
    }

    #[test]
    fn failure_carries_stage() {
        let response = JobResponse::failure("job-2", "Rendering", "ffmpeg exited with code 1");
        assert!(!response.is_success());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["stage"], "Rendering");
        assert_eq!(response.job_id(), "job-2");
    }
}
