//! Download step - fetches every referenced asset into the work directory.

use crate::download::download_all;
use crate::jobs::JobPhase;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, DownloadOutput, JobState, StepOutcome};

/// Download step.
#[derive(Debug, Default)]
pub struct DownloadStep;

impl DownloadStep {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineStep for DownloadStep {
    fn phase(&self) -> JobPhase {
        JobPhase::Downloading
    }

    fn description(&self) -> &str {
        "Fetch remote assets into the job directory"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        if ctx.request.assets.is_empty() {
            return Err(StepError::invalid_input("No assets to download"));
        }
        if !ctx.work_dir.is_dir() {
            return Err(StepError::precondition_failed(format!(
                "Work directory missing: {}",
                ctx.work_dir.display()
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let assets = &ctx.request.assets;
        ctx.logger.info(&format!(
            "Fetching {} asset(s), up to {} at a time",
            assets.len(),
            ctx.settings.download.max_concurrent.max(1)
        ));

        let downloaded = download_all(
            ctx.services.fetcher.as_ref(),
            assets,
            &ctx.work_dir,
            ctx.settings.download.max_concurrent,
            &ctx.cancel,
        )?;

        for asset in &downloaded {
            ctx.logger.info(&format!(
                "{}: {} bytes -> {}",
                asset.slot,
                asset.bytes,
                asset.path.display()
            ));
        }

        state.downloads = Some(DownloadOutput { assets: downloaded });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        let downloads = state
            .downloads
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("Downloads not recorded"))?;

        for requested in &ctx.request.assets {
            let fetched = downloads
                .assets
                .iter()
                .find(|d| d.slot == requested.slot)
                .ok_or_else(|| {
                    StepError::invalid_output(format!("{} was not downloaded", requested.slot))
                })?;
            if !fetched.path.is_file() {
                return Err(StepError::file_not_found(
                    fetched.path.display().to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_step_has_correct_name() {
        assert_eq!(DownloadStep::new().name(), "Downloading");
    }
}
