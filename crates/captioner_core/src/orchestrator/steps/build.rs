//! Build step - lays out captions and composes one graph per variant.

use crate::engine::{EncodeOptions, EngineCommand};
use crate::filtergraph::{GraphComposer, RenderInputs};
use crate::jobs::JobPhase;
use crate::models::AssetSlot;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{BuildOutput, Context, JobState, StepOutcome};

/// Build step.
///
/// Every variant is an independent composition over the same probed
/// inputs; nothing carries over from one to the next.
#[derive(Debug, Default)]
pub struct BuildStep;

impl BuildStep {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineStep for BuildStep {
    fn phase(&self) -> JobPhase {
        JobPhase::Building
    }

    fn description(&self) -> &str {
        "Compose filter graphs and engine commands"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        if ctx.variants().is_empty() {
            return Err(StepError::invalid_input("No output variants configured"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let probed = state
            .probe
            .as_ref()
            .ok_or_else(|| StepError::precondition_failed("Probe results not recorded"))?;
        let video = probed
            .asset(AssetSlot::Video)
            .ok_or_else(|| StepError::precondition_failed("Primary video not probed"))?;

        let inputs = RenderInputs {
            video,
            dialogue: probed.asset(AssetSlot::Dialogue),
            music: probed.asset(AssetSlot::Music),
            overlay_image: probed.asset(AssetSlot::OverlayImage),
            captions: &ctx.request.captions,
            mix_policy: ctx.mix_policy(),
            overlay_placement: ctx.overlay_placement(),
        };
        let composer = GraphComposer::from_settings(&ctx.settings);
        let encode = EncodeOptions::from(&ctx.settings.engine);

        let mut commands = Vec::new();
        for variant in ctx.variants() {
            ctx.logger.section(&format!("Building {}", variant));

            let composed = composer.compose(variant, &inputs).map_err(|e| {
                ctx.logger.error(&format!("Graph for {} rejected: {}", variant, e));
                e
            })?;

            for (role, layout) in &composed.layouts {
                ctx.logger.info(&format!(
                    "{} caption: {} line(s), font {}px, line height {}px, stroke {}px",
                    role,
                    layout.lines.len(),
                    layout.font_size_px,
                    layout.line_height_px,
                    layout.stroke_width_px
                ));
            }
            match composed.graph_text() {
                Some(text) => ctx.logger.debug(&format!("Graph: {}", text)),
                None => ctx.logger.info("No filtering needed; streams are copied"),
            }

            let output = ctx.work_dir.join(format!("{}.mp4", variant.file_stem()));
            commands.push(EngineCommand::from_composed(&composed, output, &encode));
        }

        state.build = Some(BuildOutput { commands });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        let build = state
            .build
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("Build results not recorded"))?;
        if build.commands.len() != ctx.variants().len() {
            return Err(StepError::invalid_output(format!(
                "Expected {} engine commands, built {}",
                ctx.variants().len(),
                build.commands.len()
            )));
        }
        Ok(())
    }
}
