//! Engine command model.
//!
//! An [`EngineCommand`] is the full description of one transcode: ordered
//! inputs, the serialized filter graph, output stream selection and codec
//! directives. It renders to the argument vector passed to the engine.

use std::path::{Path, PathBuf};

use crate::config::EngineSettings;
use crate::filtergraph::{ComposedGraph, StreamMap};
use crate::models::Variant;

/// Encoder settings used for filtered streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    pub video_codec: String,
    pub preset: String,
    pub crf: u32,
    pub pix_fmt: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    /// Move the index to the front of the file for progressive playback.
    pub faststart: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self::from(&EngineSettings::default())
    }
}

impl From<&EngineSettings> for EncodeOptions {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            video_codec: settings.video_codec.clone(),
            preset: settings.preset.clone(),
            crf: settings.crf,
            pix_fmt: settings.pix_fmt.clone(),
            audio_codec: settings.audio_codec.clone(),
            audio_bitrate: settings.audio_bitrate.clone(),
            faststart: true,
        }
    }
}

/// One engine invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineCommand {
    pub variant: Variant,
    /// Input files, in the order the graph indexes them.
    pub inputs: Vec<PathBuf>,
    /// Serialized filter graph, absent when every stream is copied.
    pub filter_graph: Option<String>,
    /// `-map` values, video first.
    pub maps: Vec<String>,
    /// Codec directives for the mapped streams.
    pub codec_args: Vec<String>,
    pub output: PathBuf,
    /// Length the output should have, when known.
    pub expected_duration: Option<f64>,
}

impl EngineCommand {
    /// Build the command for a composed variant.
    ///
    /// Filtered streams are re-encoded with `encode`; mapped input streams
    /// are stream-copied.
    pub fn from_composed(
        composed: &ComposedGraph,
        output: impl Into<PathBuf>,
        encode: &EncodeOptions,
    ) -> Self {
        let mapping = &composed.mapping;
        let maps = vec![mapping.video.map_arg(), mapping.audio.map_arg()];

        let mut codec_args = Vec::new();
        match mapping.video {
            StreamMap::Filtered(_) => codec_args.extend([
                "-c:v".to_string(),
                encode.video_codec.clone(),
                "-preset".to_string(),
                encode.preset.clone(),
                "-crf".to_string(),
                encode.crf.to_string(),
                "-pix_fmt".to_string(),
                encode.pix_fmt.clone(),
            ]),
            StreamMap::Copy(_) => codec_args.extend(["-c:v".to_string(), "copy".to_string()]),
        }
        match mapping.audio {
            StreamMap::Filtered(_) => codec_args.extend([
                "-c:a".to_string(),
                encode.audio_codec.clone(),
                "-b:a".to_string(),
                encode.audio_bitrate.clone(),
            ]),
            StreamMap::Copy(_) => codec_args.extend(["-c:a".to_string(), "copy".to_string()]),
        }
        if encode.faststart {
            codec_args.extend(["-movflags".to_string(), "+faststart".to_string()]);
        }

        Self {
            variant: composed.variant,
            inputs: composed.inputs.clone(),
            filter_graph: composed.graph_text().map(str::to_string),
            maps,
            codec_args,
            output: output.into(),
            expected_duration: composed.expected_duration,
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Full argument vector, program name excluded.
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "-hide_banner",
            "-nostdin",
            "-nostats",
            "-progress",
            "pipe:2",
            "-y",
        ]
            .iter()
            .map(|s| s.to_string())
            .collect();

        for input in &self.inputs {
            args.push("-i".to_string());
            args.push(input.to_string_lossy().into_owned());
        }

        if let Some(graph) = &self.filter_graph {
            args.push("-filter_complex".to_string());
            args.push(graph.clone());
        }

        for map in &self.maps {
            args.push("-map".to_string());
            args.push(map.clone());
        }

        args.extend(self.codec_args.iter().cloned());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }

    /// Shell-like rendering for logs.
    pub fn display_line(&self, program: &str) -> String {
        let mut line = program.to_string();
        for arg in self.args() {
            line.push(' ');
            if arg.contains([' ', '\'', '"', ';', '[']) {
                line.push('"');
                line.push_str(&arg.replace('"', "\\\""));
                line.push('"');
            } else {
                line.push_str(&arg);
            }
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filtergraph::{GraphComposer, RenderInputs};
    use crate::models::{CaptionRole, CaptionSpec, MediaAsset, MediaKind, MixDurationPolicy};

    fn video() -> MediaAsset {
        let mut video = MediaAsset::new("/work/video.mp4", MediaKind::Video);
        video.width = Some(1280);
        video.height = Some(720);
        video.duration_secs = Some(15.0);
        video.has_audio_stream = Some(false);
        video
    }

    fn position_of(args: &[String], flag: &str) -> usize {
        args.iter().position(|a| a == flag).unwrap()
    }

    #[test]
    fn filtered_streams_are_reencoded() {
        let video = video();
        let mut music = MediaAsset::new("/work/music.mp3", MediaKind::Audio);
        music.duration_secs = Some(60.0);
        let captions = [CaptionSpec::new(CaptionRole::Top, "HELLO WORLD")];
        let inputs = RenderInputs {
            video: &video,
            dialogue: None,
            music: Some(&music),
            overlay_image: None,
            captions: &captions,
            mix_policy: MixDurationPolicy::First,
            overlay_placement: Default::default(),
        };
        let composed = GraphComposer::default()
            .compose(Variant::WithOverlay, &inputs)
            .unwrap();

        let command = EngineCommand::from_composed(
            &composed,
            "/work/with_overlay.mp4",
            &EncodeOptions::default(),
        );
        let args = command.args();

        assert_eq!(args[position_of(&args, "-i") + 1], "/work/video.mp4");
        assert!(position_of(&args, "-filter_complex") < position_of(&args, "-map"));
        assert_eq!(args[position_of(&args, "-c:v") + 1], "libx264");
        assert_eq!(args[position_of(&args, "-c:a") + 1], "aac");
        assert_eq!(args.last().unwrap(), "/work/with_overlay.mp4");
        assert_eq!(command.maps[0].chars().next(), Some('['));
    }

    #[test]
    fn copy_only_command_has_no_graph() {
        let video = video();
        let inputs = RenderInputs {
            video: &video,
            dialogue: None,
            music: None,
            overlay_image: None,
            captions: &[],
            mix_policy: MixDurationPolicy::First,
            overlay_placement: Default::default(),
        };
        let composed = GraphComposer::default()
            .compose(Variant::WithoutOverlay, &inputs)
            .unwrap();

        let command =
            EngineCommand::from_composed(&composed, "/work/out.mp4", &EncodeOptions::default());
        let args = command.args();

        assert!(!args.iter().any(|a| a == "-filter_complex"));
        assert_eq!(command.maps, vec!["0:v".to_string(), "0:a?".to_string()]);
        assert_eq!(
            command.codec_args[..4],
            ["-c:v", "copy", "-c:a", "copy"].map(String::from)
        );
    }

    #[test]
    fn faststart_is_optional() {
        let video = video();
        let inputs = RenderInputs {
            video: &video,
            dialogue: None,
            music: None,
            overlay_image: None,
            captions: &[],
            mix_policy: MixDurationPolicy::First,
            overlay_placement: Default::default(),
        };
        let composed = GraphComposer::default()
            .compose(Variant::WithoutOverlay, &inputs)
            .unwrap();
        let encode = EncodeOptions {
            faststart: false,
            ..Default::default()
        };
        let command = EngineCommand::from_composed(&composed, "/work/out.mp4", &encode);
        assert!(!command.args().iter().any(|a| a == "-movflags"));
    }
}
