//! Probe step - reads duration, frame size and stream presence.

use std::collections::BTreeMap;

use crate::jobs::JobPhase;
use crate::models::{AssetSlot, MediaAsset};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, ProbeOutput, StepOutcome};
use crate::probe::probe_optional;

/// Probe step.
///
/// The primary video and any supplied audio track are required: a probe
/// failure there fails the job. The overlay image is probed best-effort.
#[derive(Debug, Default)]
pub struct ProbeStep;

impl ProbeStep {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineStep for ProbeStep {
    fn phase(&self) -> JobPhase {
        JobPhase::Probing
    }

    fn description(&self) -> &str {
        "Probe downloaded assets"
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let downloads = state
            .downloads
            .as_ref()
            .ok_or_else(|| StepError::precondition_failed("Downloads not recorded"))?;
        let probe = ctx.services.probe.as_ref();

        let mut assets = BTreeMap::new();
        for fetched in &downloads.assets {
            let mut asset = MediaAsset::new(&fetched.path, fetched.slot.kind());

            match fetched.slot {
                AssetSlot::Video => {
                    let info = probe.probe(&fetched.path)?;
                    if !info.has_video_stream {
                        return Err(StepError::invalid_input(format!(
                            "{} has no video stream",
                            fetched.path.display()
                        )));
                    }
                    info.apply_to(&mut asset);
                    ctx.logger.info(&format!(
                        "video: {}x{}, {:.3}s, audio: {}",
                        info.width.unwrap_or(0),
                        info.height.unwrap_or(0),
                        info.duration_secs,
                        if info.has_audio_stream { "yes" } else { "no" }
                    ));
                }
                AssetSlot::Dialogue | AssetSlot::Music => {
                    let info = probe.probe(&fetched.path)?;
                    if !info.has_audio_stream {
                        return Err(StepError::invalid_input(format!(
                            "{} has no audio stream",
                            fetched.path.display()
                        )));
                    }
                    info.apply_to(&mut asset);
                    ctx.logger.info(&format!(
                        "{}: {:.3}s",
                        fetched.slot, info.duration_secs
                    ));
                }
                AssetSlot::OverlayImage => match probe_optional(probe, &fetched.path) {
                    Some(info) => info.apply_to(&mut asset),
                    None => ctx
                        .logger
                        .warn("Overlay image could not be probed; using it as-is"),
                },
            }

            assets.insert(fetched.slot, asset);
        }

        state.probe = Some(ProbeOutput { assets });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        let probe = state
            .probe
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("Probe results not recorded"))?;
        if probe.asset(AssetSlot::Video).is_none() {
            return Err(StepError::invalid_output("Primary video was not probed"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_step_has_correct_name() {
        assert_eq!(ProbeStep::new().name(), "Probing");
    }
}
