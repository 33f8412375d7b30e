//! Render step - runs the engine once per variant.

use crate::engine::{is_progress_line, out_time_secs, EngineCommand, RunControl};
use crate::jobs::JobPhase;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, RenderOutput, RenderedFile, StepOutcome};

/// Render step.
///
/// Invocations are strictly sequential; two engine processes never write
/// into the same job directory at once.
#[derive(Debug, Default)]
pub struct RenderStep;

impl RenderStep {
    pub fn new() -> Self {
        Self
    }

    fn run_engine(&self, ctx: &Context, command: &EngineCommand) -> StepResult<()> {
        let engine = ctx.services.engine.as_ref();
        let program = engine.program();
        let args = command.args();

        // Log the command
        ctx.logger.command(&command.display_line(&program));

        // Log pretty format if enabled
        if ctx.settings.logging.show_options_pretty {
            ctx.logger.log_engine_args_pretty(&program, &args);
        }
        if ctx.settings.logging.show_options_json {
            ctx.logger.log_engine_args_json(&args);
        }

        ctx.logger.clear_tail();
        let control = RunControl::new(ctx.engine_timeout(), ctx.cancel.clone());
        let expected = command.expected_duration.filter(|d| *d > 0.0);
        let result = engine.run(command, &control, &|line| {
            if !is_progress_line(line) {
                ctx.logger.output_line(line, true);
            } else if let (Some(total), Some(done)) = (expected, out_time_secs(line)) {
                ctx.logger.progress(progress_percent(done, total));
            }
        });

        if let Err(e) = result {
            ctx.logger.show_tail(&format!("{} output", program));
            return Err(e.into());
        }
        Ok(())
    }
}

impl PipelineStep for RenderStep {
    fn phase(&self) -> JobPhase {
        JobPhase::Rendering
    }

    fn description(&self) -> &str {
        "Render every variant with the media engine"
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let build = state
            .build
            .as_ref()
            .ok_or_else(|| StepError::precondition_failed("Build results not recorded"))?;

        let mut files = Vec::new();
        for command in &build.commands {
            ctx.logger.section(&format!("Rendering {}", command.variant));
            self.run_engine(ctx, command)?;
            ctx.logger
                .success(&format!("Rendered {}", command.output().display()));
            files.push(RenderedFile {
                variant: command.variant,
                path: command.output.clone(),
                expected_duration: command.expected_duration,
            });
        }

        state.render = Some(RenderOutput { files });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        let render = state
            .render
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("Render results not recorded"))?;

        for file in &render.files {
            if !file.path.exists() {
                return Err(StepError::invalid_output(format!(
                    "Output file not created: {}",
                    file.path.display()
                )));
            }
        }
        Ok(())
    }
}

/// Share of `total` covered by `done`, clamped to 0..=100.
fn progress_percent(done: f64, total: f64) -> u32 {
    ((done / total) * 100.0).clamp(0.0, 100.0) as u32
}
