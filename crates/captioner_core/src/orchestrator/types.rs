//! Core types for the render pipeline.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::download::{Downloaded, Fetcher};
use crate::engine::{EngineCommand, MediaEngine};
use crate::jobs::JobPhase;
use crate::logging::JobLogger;
use crate::models::{
    AssetSlot, MediaAsset, MixDurationPolicy, OverlayPlacement, ValidatedRequest, Variant,
};
use crate::probe::MediaProbe;

use super::pipeline::CancelHandle;

/// Progress callback type for reporting pipeline progress.
///
/// Arguments: (phase, percent_complete, message)
pub type ProgressCallback = Box<dyn Fn(JobPhase, u32, &str) + Send + Sync>;

/// External collaborators a job talks to.
#[derive(Clone)]
pub struct Services {
    pub fetcher: Arc<dyn Fetcher>,
    pub probe: Arc<dyn MediaProbe>,
    pub engine: Arc<dyn MediaEngine>,
}

impl Services {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        probe: Arc<dyn MediaProbe>,
        engine: Arc<dyn MediaEngine>,
    ) -> Self {
        Self {
            fetcher,
            probe,
            engine,
        }
    }
}

/// Read-only context passed to pipeline steps.
///
/// Contains job configuration and shared resources that steps can read
/// but not modify. Mutable state goes in `JobState`.
pub struct Context {
    /// Validated request.
    pub request: ValidatedRequest,
    /// Application settings.
    pub settings: Settings,
    pub job_id: String,
    /// Private working directory; removed when the job ends.
    pub work_dir: PathBuf,
    /// Where verified outputs of this job are published.
    pub output_dir: PathBuf,
    /// Per-job logger.
    pub logger: Arc<JobLogger>,
    pub services: Services,
    /// Shared with the pipeline and every engine run.
    pub cancel: CancelHandle,
    /// Optional progress callback.
    progress_callback: Option<ProgressCallback>,
}

impl Context {
    /// Create a new context for a job.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        request: ValidatedRequest,
        settings: Settings,
        job_id: impl Into<String>,
        work_dir: PathBuf,
        output_dir: PathBuf,
        logger: Arc<JobLogger>,
        services: Services,
        cancel: CancelHandle,
    ) -> Self {
        Self {
            request,
            settings,
            job_id: job_id.into(),
            work_dir,
            output_dir,
            logger,
            services,
            cancel,
            progress_callback: None,
        }
    }

    /// Set the progress callback.
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Report progress to callback (if set).
    pub fn report_progress(&self, phase: JobPhase, percent: u32, message: &str) {
        if let Some(ref callback) = self.progress_callback {
            callback(phase, percent, message);
        }
    }

    /// Mix policy from the request, else the configured default.
    pub fn mix_policy(&self) -> MixDurationPolicy {
        self.request
            .mix_policy
            .unwrap_or(self.settings.audio.mix_duration_policy)
    }

    /// Overlay placement from the request, else the configured default.
    pub fn overlay_placement(&self) -> OverlayPlacement {
        self.request
            .overlay_placement
            .unwrap_or(self.settings.overlay.placement)
    }

    /// Variants to render, in output order.
    pub fn variants(&self) -> Vec<Variant> {
        let mut variants = self
            .request
            .variants
            .clone()
            .unwrap_or_else(|| self.settings.jobs.default_variants.clone());
        variants.sort();
        variants.dedup();
        variants
    }

    /// Per-invocation engine timeout; `None` when disabled.
    pub fn engine_timeout(&self) -> Option<Duration> {
        let secs = self.settings.engine.timeout_secs;
        (secs > 0).then(|| Duration::from_secs(secs))
    }
}

/// Mutable job state that accumulates results from pipeline steps.
///
/// Steps add their own section and never overwrite an earlier one.
#[derive(Debug, Clone, Default)]
pub struct JobState {
    /// Unique job identifier.
    pub job_id: String,
    /// When the job started.
    pub started_at: Option<String>,
    /// Fetched assets (from Downloading).
    pub downloads: Option<DownloadOutput>,
    /// Probed assets (from Probing).
    pub probe: Option<ProbeOutput>,
    /// Engine commands (from Building).
    pub build: Option<BuildOutput>,
    /// Rendered files in the work directory (from Rendering).
    pub render: Option<RenderOutput>,
    /// Published outputs (from Verifying).
    pub verify: Option<VerifyOutput>,
}

impl JobState {
    /// Create a new job state with the given ID.
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            started_at: Some(chrono::Local::now().to_rfc3339()),
            ..Default::default()
        }
    }
}

/// Output from the download step.
#[derive(Debug, Clone, Default)]
pub struct DownloadOutput {
    pub assets: Vec<Downloaded>,
}

/// Output from the probe step.
#[derive(Debug, Clone, Default)]
pub struct ProbeOutput {
    pub assets: BTreeMap<AssetSlot, MediaAsset>,
}

impl ProbeOutput {
    pub fn asset(&self, slot: AssetSlot) -> Option<&MediaAsset> {
        self.assets.get(&slot)
    }
}

/// Output from the build step.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    /// One command per variant, in render order.
    pub commands: Vec<EngineCommand>,
}

/// A file the engine wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFile {
    pub variant: Variant,
    pub path: PathBuf,
    pub expected_duration: Option<f64>,
}

/// Output from the render step.
#[derive(Debug, Clone, Default)]
pub struct RenderOutput {
    pub files: Vec<RenderedFile>,
}

/// A verified, published output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedOutput {
    pub variant: Variant,
    pub path: PathBuf,
    pub duration_secs: f64,
    pub file_size_bytes: u64,
}

/// Output from the verify step.
#[derive(Debug, Clone, Default)]
pub struct VerifyOutput {
    pub outputs: Vec<VerifiedOutput>,
}

impl VerifyOutput {
    pub fn get(&self, variant: Variant) -> Option<&VerifiedOutput> {
        self.outputs.iter().find(|o| o.variant == variant)
    }

    /// The output reported in the response stats.
    pub fn primary(&self) -> Option<&VerifiedOutput> {
        self.get(Variant::WithOverlay).or_else(|| self.outputs.first())
    }
}

/// Outcome of a step execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step completed successfully.
    Success,
    /// Step was skipped (with reason).
    Skipped(String),
}
