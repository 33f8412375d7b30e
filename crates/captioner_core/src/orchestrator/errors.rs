//! Error types for the render pipeline.
//!
//! Errors carry context that chains through layers:
//! Job → Step → Component → Detail

use std::io;

use thiserror::Error;

use crate::download::DownloadError;
use crate::engine::EngineError;
use crate::filtergraph::GraphBuildError;
use crate::jobs::JobPhase;
use crate::models::ValidationError;
use crate::probe::ProbeError;

/// Top-level pipeline error with job context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step failed during execution.
    #[error("Job '{job_id}' failed at step '{step_name}': {source}")]
    StepFailed {
        job_id: String,
        step_name: String,
        #[source]
        source: StepError,
    },

    /// The request was rejected before any I/O.
    #[error("Job '{job_id}' failed validation: {source}")]
    ValidationFailed {
        job_id: String,
        #[source]
        source: ValidationError,
    },

    /// Pipeline was cancelled.
    #[error("Job '{job_id}' was cancelled during '{step_name}'")]
    Cancelled { job_id: String, step_name: String },

    /// Failed to set up the job (work directory, logger).
    #[error("Job '{job_id}' setup failed: {message}")]
    SetupFailed { job_id: String, message: String },
}

impl PipelineError {
    /// Create a step failed error.
    pub fn step_failed(
        job_id: impl Into<String>,
        step_name: impl Into<String>,
        source: StepError,
    ) -> Self {
        Self::StepFailed {
            job_id: job_id.into(),
            step_name: step_name.into(),
            source,
        }
    }

    /// Create a validation failed error.
    pub fn validation_failed(job_id: impl Into<String>, source: ValidationError) -> Self {
        Self::ValidationFailed {
            job_id: job_id.into(),
            source,
        }
    }

    /// Create a setup failed error.
    pub fn setup_failed(job_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            job_id: job_id.into(),
            message: message.into(),
        }
    }

    /// Create a cancelled error.
    pub fn cancelled(job_id: impl Into<String>, step_name: impl Into<String>) -> Self {
        Self::Cancelled {
            job_id: job_id.into(),
            step_name: step_name.into(),
        }
    }

    /// Name of the stage the job failed in.
    pub fn stage(&self) -> &str {
        match self {
            Self::StepFailed { step_name, .. } | Self::Cancelled { step_name, .. } => step_name,
            Self::ValidationFailed { .. } => JobPhase::Validating.as_str(),
            Self::SetupFailed { .. } => JobPhase::Queued.as_str(),
        }
    }

    /// Root cause without the job/step prefix, for callers.
    pub fn root_message(&self) -> String {
        match self {
            Self::StepFailed { source, .. } => source.to_string(),
            Self::ValidationFailed { source, .. } => source.to_string(),
            Self::Cancelled { .. } => "Job was cancelled".to_string(),
            Self::SetupFailed { message, .. } => message.clone(),
        }
    }
}

/// Error from a pipeline step with operation context.
#[derive(Error, Debug)]
pub enum StepError {
    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// Output validation failed.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    GraphBuild(#[from] GraphBuildError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    IoError {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// A required file was not found.
    #[error("Required file not found: {path}")]
    FileNotFound { path: String },

    /// A precondition was not met.
    #[error("Precondition not met: {0}")]
    PreconditionFailed(String),
}

impl StepError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an invalid output error.
    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    /// Create an I/O error with context.
    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::IoError {
            operation: operation.into(),
            source,
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a precondition failed error.
    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::PreconditionFailed(message.into())
    }

    /// Whether the step stopped because the job was cancelled.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            Self::Download(DownloadError::Cancelled) | Self::Engine(EngineError::Cancelled)
        )
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_failure_keeps_stderr_verbatim() {
        let err: StepError = EngineError::Failed {
            tool: "ffmpeg".to_string(),
            exit_code: Some(1),
            stderr: "[Parsed_drawtext_0] Cannot find a valid font".to_string(),
        }
        .into();
        let pipeline_err = PipelineError::step_failed("job-1", "Rendering", err);

        assert_eq!(pipeline_err.stage(), "Rendering");
        assert!(pipeline_err
            .root_message()
            .ends_with("[Parsed_drawtext_0] Cannot find a valid font"));
    }

    #[test]
    fn pipeline_error_chains_context() {
        let step_err = StepError::file_not_found("/work/job-1/with_overlay.mp4");
        let pipeline_err = PipelineError::step_failed("job-1", "Verifying", step_err);

        let msg = pipeline_err.to_string();
        assert!(msg.contains("job-1"));
        assert!(msg.contains("Verifying"));
    }

    #[test]
    fn validation_stage_name() {
        let err = PipelineError::validation_failed("job-2", ValidationError::MissingField("video"));
        assert_eq!(err.stage(), "Validating");
        assert_eq!(err.root_message(), "Missing required field 'video'");
    }

    #[test]
    fn cancellation_is_detected() {
        assert!(StepError::from(EngineError::Cancelled).is_cancellation());
        assert!(StepError::from(DownloadError::Cancelled).is_cancellation());
        assert!(!StepError::invalid_output("empty").is_cancellation());
    }
}
