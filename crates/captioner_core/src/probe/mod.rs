//! Media metadata probing.
//!
//! [`MediaProbe`] is the narrow interface the pipeline uses to learn a
//! file's duration, frame size and stream presence. [`FfprobeProbe`] backs
//! it with the engine's metadata inspector.

mod ffprobe;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::MediaAsset;

pub use ffprobe::{parse_ffprobe_json, FfprobeProbe};

/// Errors raised while probing a file.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to run {tool}: {message}")]
    SpawnFailed { tool: String, message: String },

    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    #[error("Unreadable probe output: {0}")]
    InvalidOutput(#[from] serde_json::Error),

    #[error("No decodable streams in {0}")]
    NotMedia(PathBuf),
}

/// Result type for probe operations.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Metadata of one media file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeInfo {
    /// Duration in seconds; zero for still images or when unknown.
    pub duration_secs: f64,
    /// Width of the first video stream.
    pub width: Option<u32>,
    /// Height of the first video stream.
    pub height: Option<u32>,
    pub has_video_stream: bool,
    pub has_audio_stream: bool,
}

impl ProbeInfo {
    /// Copy the probed metadata onto an asset.
    pub fn apply_to(&self, asset: &mut MediaAsset) {
        asset.duration_secs = (self.duration_secs > 0.0).then_some(self.duration_secs);
        asset.width = self.width;
        asset.height = self.height;
        asset.has_audio_stream = Some(self.has_audio_stream);
    }
}

/// Source of media metadata.
pub trait MediaProbe: Send + Sync {
    /// Probe a file.
    fn probe(&self, path: &Path) -> ProbeResult<ProbeInfo>;

    /// Audio presence of an optional asset; any failure counts as absent.
    fn has_audio(&self, path: &Path) -> bool {
        match self.probe(path) {
            Ok(info) => info.has_audio_stream,
            Err(e) => {
                tracing::debug!("Treating {} as silent: {}", path.display(), e);
                false
            }
        }
    }
}

/// Probe an optional asset, swallowing failures.
pub fn probe_optional(probe: &dyn MediaProbe, path: &Path) -> Option<ProbeInfo> {
    match probe.probe(path) {
        Ok(info) => Some(info),
        Err(e) => {
            tracing::warn!("Ignoring probe failure for {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaKind;

    struct Failing;

    impl MediaProbe for Failing {
        fn probe(&self, path: &Path) -> ProbeResult<ProbeInfo> {
            Err(ProbeError::NotMedia(path.to_path_buf()))
        }
    }

    #[test]
    fn optional_probe_failure_is_absent() {
        let path = Path::new("/tmp/not-media.txt");
        assert!(!Failing.has_audio(path));
        assert!(probe_optional(&Failing, path).is_none());
    }

    #[test]
    fn apply_fills_asset() {
        let info = ProbeInfo {
            duration_secs: 15.0,
            width: Some(1280),
            height: Some(720),
            has_video_stream: true,
            has_audio_stream: false,
        };
        let mut asset = MediaAsset::new("/work/video.mp4", MediaKind::Video);
        info.apply_to(&mut asset);
        assert_eq!(asset.dimensions(), Some((1280, 720)));
        assert_eq!(asset.duration_secs, Some(15.0));
        assert_eq!(asset.has_audio_stream, Some(false));
        assert!(asset.is_probed());
    }

    #[test]
    fn still_image_has_no_duration() {
        let info = ProbeInfo {
            has_video_stream: true,
            width: Some(200),
            height: Some(100),
            ..Default::default()
        };
        let mut asset = MediaAsset::new("/work/overlay.png", MediaKind::Image);
        info.apply_to(&mut asset);
        assert_eq!(asset.duration_secs, None);
    }
}
