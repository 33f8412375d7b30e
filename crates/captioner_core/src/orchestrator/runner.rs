//! Job runner that takes a request from validation to a response.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::download::{DownloadResult, HttpFetcher};
use crate::engine::FfmpegEngine;
use crate::jobs::{InMemoryJobStore, JobPhase, JobStatusRecord, JobStore};
use crate::logging::{JobLogger, LogConfig};
use crate::models::{Downloads, JobRequest, JobResponse, RenderStats, Variant};
use crate::probe::FfprobeProbe;

use super::create_render_pipeline;
use super::errors::PipelineError;
use super::pipeline::CancelHandle;
use super::types::{Context, JobState, ProgressCallback, Services, VerifyOutput};
use super::workdir::WorkDir;

/// Runs render jobs end to end.
///
/// Each call to [`Orchestrator::run`] gets a fresh job id, its own work
/// directory and log file; concurrent jobs share nothing but the store.
pub struct Orchestrator {
    settings: Settings,
    services: Services,
    store: Arc<dyn JobStore>,
}

impl Orchestrator {
    pub fn new(settings: Settings, services: Services, store: Arc<dyn JobStore>) -> Self {
        Self {
            settings,
            services,
            store,
        }
    }

    /// Wire the production collaborators from settings.
    pub fn from_settings(settings: Settings) -> DownloadResult<Self> {
        let fetcher = HttpFetcher::from_settings(&settings.download)?;
        let probe = FfprobeProbe::new(&settings.engine.ffprobe_path);
        let engine = FfmpegEngine::new(&settings.engine.ffmpeg_path)
            .with_tail_lines(settings.logging.error_tail as usize);
        let store = InMemoryJobStore::new(Duration::from_secs(settings.jobs.status_ttl_secs));

        let services = Services::new(Arc::new(fetcher), Arc::new(probe), Arc::new(engine));
        Ok(Self::new(settings, services, Arc::new(store)))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Status records of every job this orchestrator has seen.
    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Run a job to completion.
    pub fn run(&self, request: &JobRequest) -> JobResponse {
        self.run_with_cancel(request, CancelHandle::new(), None)
    }

    /// Run a job that can be cancelled from another thread.
    pub fn run_with_cancel(
        &self,
        request: &JobRequest,
        cancel: CancelHandle,
        progress: Option<ProgressCallback>,
    ) -> JobResponse {
        let job_id = uuid::Uuid::new_v4().to_string();
        self.store.set(JobStatusRecord::queued(&job_id));
        let purged = self.store.purge_expired();
        if purged > 0 {
            tracing::debug!("Purged {} expired job record(s)", purged);
        }

        let response = match self.execute(&job_id, request, cancel, progress) {
            Ok(verified) => {
                tracing::info!("[{}] Job complete", job_id);
                success_response(&job_id, &verified)
            }
            Err(e) => {
                tracing::error!("[{}] {}", job_id, e);
                JobResponse::failure(&job_id, e.stage(), e.root_message())
            }
        };

        self.store.set(JobStatusRecord::finished(response.clone()));
        response
    }

    fn execute(
        &self,
        job_id: &str,
        request: &JobRequest,
        cancel: CancelHandle,
        progress: Option<ProgressCallback>,
    ) -> Result<VerifyOutput, PipelineError> {
        // Reject malformed requests before touching disk or network
        self.store.transition(job_id, JobPhase::Validating);
        let validated = request
            .validate(self.settings.jobs.require_audio_source)
            .map_err(|e| PipelineError::validation_failed(job_id, e))?;

        let work = WorkDir::create(&PathBuf::from(&self.settings.paths.work_root), job_id)
            .map_err(|e| {
                PipelineError::setup_failed(job_id, format!("Failed to create work directory: {}", e))
            })?;

        let logger = JobLogger::new(
            job_id,
            &self.settings.paths.logs_folder,
            LogConfig::from_settings(&self.settings.logging),
            None,
        )
        .map_err(|e| PipelineError::setup_failed(job_id, format!("Failed to create logger: {}", e)))?;
        let logger = Arc::new(logger);

        let output_dir = PathBuf::from(&self.settings.paths.output_folder).join(job_id);
        let store = Arc::clone(&self.store);
        let tracked_id = job_id.to_string();
        let on_progress: ProgressCallback = Box::new(move |phase: JobPhase, percent: u32, message: &str| {
            store.transition(&tracked_id, phase);
            if let Some(callback) = &progress {
                callback(phase, percent, message);
            }
        });

        let ctx = Context::new(
            validated,
            self.settings.clone(),
            job_id,
            work.path().to_path_buf(),
            output_dir,
            Arc::clone(&logger),
            self.services.clone(),
            cancel.clone(),
        )
        .with_progress_callback(on_progress);

        logger.info(&format!("Starting job {}", job_id));
        logger.info(&format!(
            "Assets: {}",
            ctx.request
                .assets
                .iter()
                .map(|a| a.slot.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ));

        let pipeline = create_render_pipeline().with_cancel_handle(cancel);
        let mut state = JobState::new(job_id);
        let result = pipeline.run(&ctx, &mut state);
        logger.flush();

        // Work directory goes away here, verified outputs have already moved
        drop(work);

        result?;
        state.verify.ok_or_else(|| {
            PipelineError::setup_failed(job_id, "Pipeline finished without verified outputs")
        })
    }
}

fn success_response(job_id: &str, verified: &VerifyOutput) -> JobResponse {
    let downloads = Downloads {
        with_overlay: verified.get(Variant::WithOverlay).map(|o| o.path.clone()),
        without_overlay: verified.get(Variant::WithoutOverlay).map(|o| o.path.clone()),
    };
    let stats = verified
        .primary()
        .map(|o| RenderStats {
            duration_seconds: o.duration_secs,
            file_size_bytes: o.file_size_bytes,
        })
        .unwrap_or_default();
    JobResponse::success(job_id, downloads, stats)
}
