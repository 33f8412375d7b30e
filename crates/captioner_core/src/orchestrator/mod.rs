//! Render job orchestration.
//!
//! A job moves through a fixed sequence of phases. Validation happens
//! before anything is created on disk; every later phase is a pipeline
//! step that validates, executes, and records its results.
//!
//! # Architecture
//!
//! ```text
//! Orchestrator
//!     ├── validate request          (Validating)
//!     └── Pipeline
//!         ├── Step: Download        (Downloading)
//!         ├── Step: Probe           (Probing)
//!         ├── Step: Build           (Building)
//!         ├── Step: Render          (Rendering)
//!         └── Step: Verify          (Verifying)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use captioner_core::orchestrator::Orchestrator;
//!
//! let orchestrator = Orchestrator::from_settings(settings)?;
//! let response = orchestrator.run(&request);
//! println!("{}", serde_json::to_string_pretty(&response)?);
//! ```

mod errors;
mod pipeline;
mod runner;
mod step;
pub mod steps;
mod types;
mod workdir;

pub use errors::{PipelineError, PipelineResult, StepError, StepResult};
pub use pipeline::{CancelHandle, Pipeline, PipelineRunResult};
pub use runner::Orchestrator;
pub use step::PipelineStep;
pub use steps::{BuildStep, DownloadStep, ProbeStep, RenderStep, VerifyStep};
pub use types::{
    BuildOutput, Context, DownloadOutput, JobState, ProbeOutput, ProgressCallback, RenderOutput,
    RenderedFile, Services, StepOutcome, VerifiedOutput, VerifyOutput,
};
pub use workdir::WorkDir;

/// Create the render pipeline with all steps in order.
///
/// 1. Download - fetch every referenced asset
/// 2. Probe - read duration, frame size and stream presence
/// 3. Build - lay out captions and compose one graph per variant
/// 4. Render - run the engine for each variant
/// 5. Verify - check outputs and move them to the output folder
pub fn create_render_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(DownloadStep::new())
        .with_step(ProbeStep::new())
        .with_step(BuildStep::new())
        .with_step(RenderStep::new())
        .with_step(VerifyStep::new())
}
