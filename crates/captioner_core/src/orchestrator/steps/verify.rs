//! Verify step - checks rendered files and publishes them.

use std::fs;
use std::path::Path;

use crate::jobs::JobPhase;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{
    Context, JobState, RenderedFile, StepOutcome, VerifiedOutput, VerifyOutput,
};
use crate::probe::probe_optional;

/// Verify step.
///
/// Every rendered file is checked before any of them is moved, so a job
/// never publishes a partial set of outputs.
#[derive(Debug, Default)]
pub struct VerifyStep;

impl VerifyStep {
    pub fn new() -> Self {
        Self
    }

    fn check(&self, ctx: &Context, file: &RenderedFile) -> StepResult<(f64, u64)> {
        let meta = fs::metadata(&file.path)
            .map_err(|_| StepError::file_not_found(file.path.display().to_string()))?;
        if meta.len() == 0 {
            return Err(StepError::invalid_output(format!(
                "Rendered {} is empty",
                file.variant
            )));
        }

        let duration = match probe_optional(ctx.services.probe.as_ref(), &file.path) {
            Some(info) if info.duration_secs > 0.0 => info.duration_secs,
            _ => {
                ctx.logger.warn(&format!(
                    "Could not re-probe {}; reporting the expected duration",
                    file.variant
                ));
                file.expected_duration.unwrap_or(0.0)
            }
        };
        Ok((duration, meta.len()))
    }
}

impl PipelineStep for VerifyStep {
    fn phase(&self) -> JobPhase {
        JobPhase::Verifying
    }

    fn description(&self) -> &str {
        "Verify rendered outputs and publish them"
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let render = state
            .render
            .as_ref()
            .ok_or_else(|| StepError::precondition_failed("Render results not recorded"))?;

        let mut checked = Vec::with_capacity(render.files.len());
        for file in &render.files {
            let (duration, size) = self.check(ctx, file)?;
            ctx.logger.info(&format!(
                "{}: {:.3}s, {} bytes",
                file.variant, duration, size
            ));
            checked.push((file, duration, size));
        }

        fs::create_dir_all(&ctx.output_dir)
            .map_err(|e| StepError::io_error("creating output directory", e))?;

        let mut outputs = Vec::with_capacity(checked.len());
        for (file, duration_secs, file_size_bytes) in checked {
            let name = file
                .path
                .file_name()
                .ok_or_else(|| StepError::invalid_output("Rendered file has no name"))?;
            let dest = ctx.output_dir.join(name);

            if let Err(e) = move_file(&file.path, &dest) {
                let _ = fs::remove_dir_all(&ctx.output_dir);
                return Err(StepError::io_error("publishing output", e));
            }
            ctx.logger.success(&format!("Published {}", dest.display()));

            outputs.push(VerifiedOutput {
                variant: file.variant,
                path: dest,
                duration_secs,
                file_size_bytes,
            });
        }

        state.verify = Some(VerifyOutput { outputs });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        let verify = state
            .verify
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("Verification results not recorded"))?;

        for variant in ctx.variants() {
            let output = verify.get(variant).ok_or_else(|| {
                StepError::invalid_output(format!("{} was not published", variant))
            })?;
            if !output.path.is_file() {
                return Err(StepError::file_not_found(output.path.display().to_string()));
            }
        }
        Ok(())
    }
}

/// Move a file, copying when the rename crosses filesystems.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn verify_step_has_correct_name() {
        assert_eq!(VerifyStep::new().name(), "Verifying");
    }

    #[test]
    fn move_file_relocates_contents() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("with_overlay.mp4");
        let to = dir.path().join("published.mp4");
        fs::write(&from, b"rendered").unwrap();

        move_file(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), b"rendered");
    }
}
