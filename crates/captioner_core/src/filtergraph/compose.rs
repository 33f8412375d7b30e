//! Composition of a full render graph for one output variant.
//!
//! The composer turns probed inputs and captions into stages:
//!
//! ```text
//! [0:v] -> overlay image -> top lines -> bottom lines -> branding lines -> video sink
//! [n:a] -> atrim -> volume -> afade in -> afade out --+
//! [m:a] -> atrim -> volume -> afade in -> afade out --+-> amix (2+ tracks) -> audio sink
//! ```
//!
//! Inputs are attached in a fixed order: primary video first, then
//! dialogue, music and overlay image when present and used by the variant.

use std::path::PathBuf;

use crate::config::Settings;
use crate::layout::{LayoutEngine, LayoutParams, LayoutResult};
use crate::models::{
    AudioMixPlan, AudioSource, AudioTrack, CaptionRole, CaptionSpec, MediaAsset,
    MixDurationPolicy, OverlayCorner, OverlayPlacement, Variant,
};

use super::builder::{FilterGraph, GraphBuilder};
use super::errors::GraphBuildError;
use super::stage::{DrawText, FadeKind, FilterOp, StreamKind, StreamLabel};

/// Probed job inputs shared by every variant.
#[derive(Debug, Clone)]
pub struct RenderInputs<'a> {
    pub video: &'a MediaAsset,
    pub dialogue: Option<&'a MediaAsset>,
    pub music: Option<&'a MediaAsset>,
    pub overlay_image: Option<&'a MediaAsset>,
    pub captions: &'a [CaptionSpec],
    pub mix_policy: MixDurationPolicy,
    pub overlay_placement: OverlayPlacement,
}

/// Where an output stream comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamMap {
    /// A graph sink label; the stream is re-encoded.
    Filtered(String),
    /// An input stream specifier; the stream is copied.
    Copy(String),
}

impl StreamMap {
    /// Argument for `-map`.
    pub fn map_arg(&self) -> String {
        match self {
            StreamMap::Filtered(label) => format!("[{}]", label),
            StreamMap::Copy(spec) => spec.clone(),
        }
    }

    pub fn is_filtered(&self) -> bool {
        matches!(self, StreamMap::Filtered(_))
    }
}

/// Output selection for the rendered file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputMapping {
    pub video: StreamMap,
    pub audio: StreamMap,
}

/// Everything needed to invoke the engine for one variant.
#[derive(Debug, Clone)]
pub struct ComposedGraph {
    pub variant: Variant,
    /// Engine inputs in attachment order.
    pub inputs: Vec<PathBuf>,
    /// `None` when no stream is filtered.
    pub graph: Option<FilterGraph>,
    pub mapping: OutputMapping,
    /// Layouts of the captions drawn, in draw order.
    pub layouts: Vec<(CaptionRole, LayoutResult)>,
    pub audio_plan: AudioMixPlan,
    /// Expected output length in seconds, when known.
    pub expected_duration: Option<f64>,
}

impl ComposedGraph {
    pub fn graph_text(&self) -> Option<&str> {
        self.graph.as_ref().map(|g| g.graph_text.as_str())
    }
}

/// Fonts, colours and spacing of drawn captions.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionStyle {
    pub font_file: Option<String>,
    pub cjk_font_file: Option<String>,
    pub font_color: String,
    pub border_color: String,
    /// Distance between a caption block and the frame edge.
    pub margin: u32,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_file: None,
            cjk_font_file: None,
            font_color: "white".to_string(),
            border_color: "black".to_string(),
            margin: 40,
        }
    }
}

/// Gains and fades applied to the audio tracks.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioPolicy {
    pub dialogue_gain_db: f64,
    pub music_gain_db: f64,
    pub fade_in_secs: f64,
    pub fade_out_secs: f64,
    /// Mix the video's own audio with music when no dialogue is given.
    pub keep_original_audio: bool,
    /// Trim new audio to the primary video's duration.
    pub bound_to_video: bool,
}

impl Default for AudioPolicy {
    fn default() -> Self {
        Self {
            dialogue_gain_db: 0.0,
            music_gain_db: -3.0,
            fade_in_secs: 1.0,
            fade_out_secs: 2.0,
            keep_original_audio: true,
            bound_to_video: true,
        }
    }
}

/// Builds render graphs for output variants.
#[derive(Debug, Clone, Default)]
pub struct GraphComposer {
    layout: LayoutEngine,
    style: CaptionStyle,
    audio: AudioPolicy,
}

impl GraphComposer {
    pub fn new(layout: LayoutEngine, style: CaptionStyle, audio: AudioPolicy) -> Self {
        Self {
            layout,
            style,
            audio,
        }
    }

    /// Composer configured from the `[layout]`, `[audio]` and `[engine]` sections.
    pub fn from_settings(settings: &Settings) -> Self {
        let non_empty = |s: &str| (!s.trim().is_empty()).then(|| s.to_string());
        let style = CaptionStyle {
            font_file: non_empty(&settings.layout.font_file),
            cjk_font_file: non_empty(&settings.layout.cjk_font_file),
            font_color: settings.layout.font_color.clone(),
            border_color: settings.layout.border_color.clone(),
            margin: settings.layout.caption_margin,
        };
        let audio = AudioPolicy {
            dialogue_gain_db: settings.audio.dialogue_gain_db,
            music_gain_db: settings.audio.music_gain_db,
            fade_in_secs: settings.audio.fade_in_secs,
            fade_out_secs: settings.audio.fade_out_secs,
            keep_original_audio: settings.audio.keep_original_audio,
            bound_to_video: settings.engine.bound_to_video,
        };
        Self::new(
            LayoutEngine::new(LayoutParams::from(&settings.layout)),
            style,
            audio,
        )
    }

    /// Compose the graph and output mapping for one variant.
    pub fn compose(
        &self,
        variant: Variant,
        inputs: &RenderInputs<'_>,
    ) -> Result<ComposedGraph, GraphBuildError> {
        let mut paths = vec![inputs.video.path.clone()];
        let mut attach = |asset: Option<&MediaAsset>| {
            asset.map(|a| {
                paths.push(a.path.clone());
                paths.len() - 1
            })
        };
        let dialogue_idx = attach(inputs.dialogue);
        let music_idx = attach(inputs.music);
        let overlay_idx = match variant {
            Variant::WithOverlay => attach(inputs.overlay_image),
            Variant::WithoutOverlay => None,
        };

        let mut builder = GraphBuilder::new(paths.len());
        let mut sinks = Vec::new();

        let (video_sink, layouts) = match variant {
            Variant::WithOverlay => self.video_chain(&mut builder, inputs, overlay_idx)?,
            Variant::WithoutOverlay => (None, Vec::new()),
        };

        let audio_plan = self.plan_audio(inputs, dialogue_idx, music_idx);
        let audio_sink = self.audio_chain(&mut builder, &audio_plan);

        let video = match video_sink {
            Some(label) => {
                sinks.push(label.clone());
                StreamMap::Filtered(label.name())
            }
            None => StreamMap::Copy("0:v".to_string()),
        };
        let audio = match audio_sink {
            Some(label) => {
                sinks.push(label.clone());
                StreamMap::Filtered(label.name())
            }
            None => StreamMap::Copy("0:a?".to_string()),
        };

        let graph = if builder.is_empty() {
            None
        } else {
            Some(builder.build(&sinks)?)
        };

        let expected_duration = audio_plan
            .expected_duration()
            .or(inputs.video.duration_secs);

        Ok(ComposedGraph {
            variant,
            inputs: paths,
            graph,
            mapping: OutputMapping { video, audio },
            layouts,
            audio_plan,
            expected_duration,
        })
    }

    /// Decide which tracks make up the audio mix.
    ///
    /// Dialogue replaces the video's own audio; without dialogue the
    /// original audio is kept under the music when configured to.
    pub fn plan_audio(
        &self,
        inputs: &RenderInputs<'_>,
        dialogue_idx: Option<usize>,
        music_idx: Option<usize>,
    ) -> AudioMixPlan {
        let video_duration = inputs.video.duration_secs;
        let mut plan = AudioMixPlan::new(inputs.mix_policy);

        let dialogue = inputs.dialogue.zip(dialogue_idx);
        let music = inputs.music.zip(music_idx);

        if let Some((asset, idx)) = dialogue {
            let duration = asset.duration_secs.or(video_duration).unwrap_or(0.0);
            plan = plan.with_track(
                AudioTrack::new(AudioSource::Dialogue, idx, duration)
                    .with_volume_db(self.audio.dialogue_gain_db),
            );
        } else if music.is_some() && self.audio.keep_original_audio && inputs.video.has_audio() {
            plan = plan.with_track(
                AudioTrack::new(AudioSource::Original, 0, video_duration.unwrap_or(0.0))
                    .with_volume_db(self.audio.dialogue_gain_db),
            );
        }

        if let Some((asset, idx)) = music {
            let duration = asset.duration_secs.or(video_duration).unwrap_or(0.0);
            // Fade timing needs a known length
            let fade_out = if duration > 0.0 {
                self.audio.fade_out_secs
            } else {
                0.0
            };
            plan = plan.with_track(
                AudioTrack::new(AudioSource::Music, idx, duration)
                    .with_volume_db(self.audio.music_gain_db)
                    .with_fades(self.audio.fade_in_secs, fade_out),
            );
        }

        if let (true, Some(limit)) = (self.audio.bound_to_video, video_duration) {
            plan.tracks = plan
                .tracks
                .into_iter()
                .map(|track| track.trimmed_to(limit))
                .collect();
        }

        plan
    }

    fn audio_chain(&self, builder: &mut GraphBuilder, plan: &AudioMixPlan) -> Option<StreamLabel> {
        let outputs: Vec<StreamLabel> = plan
            .tracks
            .iter()
            .map(|track| {
                let mut current = StreamLabel::input(track.input_index, StreamKind::Audio);
                if let Some(end_secs) = track.trim_to_secs {
                    current = builder.chain(current, FilterOp::ATrim { end_secs });
                }
                current = builder.chain(
                    current,
                    FilterOp::Volume {
                        db: track.volume_db,
                    },
                );
                if let Some(duration_secs) = track.fade_in_secs {
                    current = builder.chain(
                        current,
                        FilterOp::AFade {
                            kind: FadeKind::In,
                            start_secs: 0.0,
                            duration_secs,
                        },
                    );
                }
                if let (Some(duration_secs), Some(start_secs)) =
                    (track.fade_out_secs, track.fade_out_start())
                {
                    current = builder.chain(
                        current,
                        FilterOp::AFade {
                            kind: FadeKind::Out,
                            start_secs,
                            duration_secs,
                        },
                    );
                }
                current
            })
            .collect();

        match outputs.len() {
            0 => None,
            1 => outputs.into_iter().next(),
            n => Some(builder.push(
                outputs,
                FilterOp::AMix {
                    inputs: n,
                    duration: plan.duration_policy,
                },
            )),
        }
    }

    fn video_chain(
        &self,
        builder: &mut GraphBuilder,
        inputs: &RenderInputs<'_>,
        overlay_idx: Option<usize>,
    ) -> Result<(Option<StreamLabel>, Vec<(CaptionRole, LayoutResult)>), GraphBuildError> {
        let base = StreamLabel::input(0, StreamKind::Video);
        let mut current = base.clone();

        if let Some(idx) = overlay_idx {
            current = self.overlay(builder, current, idx, inputs)?;
        }

        let mut captions: Vec<&CaptionSpec> = inputs.captions.iter().collect();
        captions.sort_by_key(|c| c.role);

        let mut layouts = Vec::new();
        if captions.iter().any(|c| !c.is_blank()) {
            let (width, height) = inputs
                .video
                .dimensions()
                .ok_or(GraphBuildError::MissingFrameSize)?;

            for caption in captions {
                let layout = self.layout.layout_caption(caption, width, height);
                // Nothing to draw: no stage at all for this caption
                if layout.is_empty() {
                    continue;
                }
                current = self.draw_caption(builder, current, caption, &layout);
                layouts.push((caption.role, layout));
            }
        }

        let sink = (current != base).then_some(current);
        Ok((sink, layouts))
    }

    fn overlay(
        &self,
        builder: &mut GraphBuilder,
        base: StreamLabel,
        idx: usize,
        inputs: &RenderInputs<'_>,
    ) -> Result<StreamLabel, GraphBuildError> {
        let image = StreamLabel::input(idx, StreamKind::Video);
        let (image, x, y) = match inputs.overlay_placement {
            OverlayPlacement::Corner { corner, margin } => {
                let (x, y) = corner_position(corner, margin);
                (image, x, y)
            }
            OverlayPlacement::FullFrame => {
                let (width, height) = frame_size(inputs.video)?;
                let scaled = builder.chain(image, FilterOp::Scale { width, height });
                (scaled, "0".to_string(), "0".to_string())
            }
            OverlayPlacement::BottomBar => {
                let (width, _) = frame_size(inputs.video)?;
                let scaled = builder.chain(image, FilterOp::Scale { width, height: -1 });
                (scaled, "(W-w)/2".to_string(), "H-h".to_string())
            }
        };
        Ok(builder.push(vec![base, image], FilterOp::Overlay { x, y }))
    }

    /// One draw stage per wrapped line, threaded through `current`.
    fn draw_caption(
        &self,
        builder: &mut GraphBuilder,
        mut current: StreamLabel,
        caption: &CaptionSpec,
        layout: &LayoutResult,
    ) -> StreamLabel {
        let font_file = if caption.effective_language().is_cjk() {
            self.style
                .cjk_font_file
                .clone()
                .or_else(|| self.style.font_file.clone())
        } else {
            self.style.font_file.clone()
        };

        let count = layout.lines.len() as u32;
        let margin = self.style.margin;
        for (i, line) in layout.lines.iter().enumerate() {
            let i = i as u32;
            let from_bottom = |m: u32| format!("h-{}", m + (count - i) * layout.line_height_px);
            let (x, y) = match caption.role {
                CaptionRole::Top => (
                    "(w-text_w)/2".to_string(),
                    (margin + i * layout.line_height_px).to_string(),
                ),
                CaptionRole::Bottom => ("(w-text_w)/2".to_string(), from_bottom(margin)),
                CaptionRole::Branding => {
                    let m = margin / 2;
                    (format!("w-text_w-{}", m), from_bottom(m))
                }
            };
            current = builder.chain(
                current,
                FilterOp::DrawText(DrawText {
                    text: line.clone(),
                    font_file: font_file.clone(),
                    font_size: layout.font_size_px,
                    font_color: self.style.font_color.clone(),
                    border_width: layout.stroke_width_px,
                    border_color: self.style.border_color.clone(),
                    x,
                    y,
                }),
            );
        }
        current
    }
}

fn frame_size(video: &MediaAsset) -> Result<(i32, i32), GraphBuildError> {
    let (w, h) = video.dimensions().ok_or(GraphBuildError::MissingFrameSize)?;
    let w = i32::try_from(w).map_err(|_| GraphBuildError::MissingFrameSize)?;
    let h = i32::try_from(h).map_err(|_| GraphBuildError::MissingFrameSize)?;
    Ok((w, h))
}

/// Position expressions in the engine's own width/height variables.
fn corner_position(corner: OverlayCorner, margin: u32) -> (String, String) {
    let left = margin.to_string();
    let top = margin.to_string();
    let right = format!("W-w-{}", margin);
    let bottom = format!("H-h-{}", margin);
    match corner {
        OverlayCorner::TopLeft => (left, top),
        OverlayCorner::TopRight => (right, top),
        OverlayCorner::BottomLeft => (left, bottom),
        OverlayCorner::BottomRight => (right, bottom),
    }
}
