//! Probing through `ffprobe -show_streams -show_format -of json`.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;

use super::{MediaProbe, ProbeError, ProbeInfo, ProbeResult};

/// [`MediaProbe`] backed by the ffprobe executable.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    program: PathBuf,
}

impl FfprobeProbe {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ffprobe".to_string())
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl MediaProbe for FfprobeProbe {
    fn probe(&self, path: &Path) -> ProbeResult<ProbeInfo> {
        if !path.exists() {
            return Err(ProbeError::FileNotFound(path.to_path_buf()));
        }

        tracing::debug!("Probing file: {}", path.display());

        let output = Command::new(&self.program)
            .args(["-v", "error", "-show_streams", "-show_format", "-of", "json"])
            .arg(path)
            .output()
            .map_err(|e| ProbeError::SpawnFailed {
                tool: self.tool_name(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProbeError::CommandFailed {
                tool: self.tool_name(),
                exit_code: output.status.code().unwrap_or(-1),
                message: stderr.trim().to_string(),
            });
        }

        let json: Value = serde_json::from_slice(&output.stdout)?;
        parse_ffprobe_json(&json, path)
    }
}

/// Parse ffprobe's JSON report.
///
/// Duration comes from the container, falling back to the longest
/// stream. A report without any audio or video stream is not media.
pub fn parse_ffprobe_json(json: &Value, path: &Path) -> ProbeResult<ProbeInfo> {
    let streams = json
        .get("streams")
        .and_then(|s| s.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut info = ProbeInfo::default();
    let mut stream_duration = 0.0f64;

    for stream in streams {
        match stream.get("codec_type").and_then(|t| t.as_str()) {
            Some("video") => {
                if !info.has_video_stream {
                    info.width = dimension(stream, "width");
                    info.height = dimension(stream, "height");
                }
                info.has_video_stream = true;
            }
            Some("audio") => info.has_audio_stream = true,
            _ => continue,
        }
        if let Some(d) = seconds(stream.get("duration")) {
            stream_duration = stream_duration.max(d);
        }
    }

    if !info.has_video_stream && !info.has_audio_stream {
        return Err(ProbeError::NotMedia(path.to_path_buf()));
    }

    info.duration_secs = json
        .get("format")
        .and_then(|f| seconds(f.get("duration")))
        .unwrap_or(stream_duration);

    Ok(info)
}

fn dimension(stream: &Value, key: &str) -> Option<u32> {
    stream
        .get(key)
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
}

/// ffprobe reports durations as strings ("15.000000") or "N/A".
fn seconds(value: Option<&Value>) -> Option<f64> {
    let d = match value? {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    (d.is_finite() && d > 0.0).then_some(d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_video_without_audio() {
        let report = json!({
            "streams": [
                {"index": 0, "codec_type": "video", "width": 1280, "height": 720, "duration": "15.000000"},
                {"index": 1, "codec_type": "data"}
            ],
            "format": {"duration": "15.015000"}
        });
        let info = parse_ffprobe_json(&report, Path::new("clip.mp4")).unwrap();
        assert_eq!(info.width, Some(1280));
        assert_eq!(info.height, Some(720));
        assert!(info.has_video_stream);
        assert!(!info.has_audio_stream);
        assert!((info.duration_secs - 15.015).abs() < 1e-9);
    }

    #[test]
    fn falls_back_to_stream_duration() {
        let report = json!({
            "streams": [
                {"codec_type": "audio", "duration": "59.98"},
                {"codec_type": "audio", "duration": "60.02"}
            ],
            "format": {"duration": "N/A"}
        });
        let info = parse_ffprobe_json(&report, Path::new("song.mp3")).unwrap();
        assert!(info.has_audio_stream);
        assert_eq!(info.width, None);
        assert!((info.duration_secs - 60.02).abs() < 1e-9);
    }

    #[test]
    fn still_image_has_zero_duration() {
        let report = json!({
            "streams": [{"codec_type": "video", "width": 300, "height": 120}],
            "format": {}
        });
        let info = parse_ffprobe_json(&report, Path::new("logo.png")).unwrap();
        assert_eq!(info.duration_secs, 0.0);
        assert_eq!(info.width, Some(300));
    }

    #[test]
    fn no_streams_is_not_media() {
        let report = json!({"streams": [], "format": {"duration": "1.0"}});
        assert!(matches!(
            parse_ffprobe_json(&report, Path::new("notes.txt")),
            Err(ProbeError::NotMedia(_))
        ));
    }

    #[test]
    fn missing_file_fails_before_spawning() {
        let probe = FfprobeProbe::new("/nonexistent/ffprobe");
        assert!(matches!(
            probe.probe(Path::new("/nonexistent/clip.mp4")),
            Err(ProbeError::FileNotFound(_))
        ));
    }
}
