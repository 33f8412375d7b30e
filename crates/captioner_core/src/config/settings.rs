//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

use crate::models::{MixDurationPolicy, OverlayPlacement, Variant};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Media engine invocation.
    #[serde(default)]
    pub engine: EngineSettings,

    /// Remote asset fetching.
    #[serde(default)]
    pub download: DownloadSettings,

    /// Caption layout constants and fonts.
    #[serde(default)]
    pub layout: LayoutSettings,

    /// Audio gains, fades and mix policy.
    #[serde(default)]
    pub audio: AudioSettings,

    /// Overlay image placement.
    #[serde(default)]
    pub overlay: OverlaySettings,

    /// Job bookkeeping.
    #[serde(default)]
    pub jobs: JobSettings,
}

/// Path configuration for work, output, and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Root folder under which each job gets a private work directory.
    #[serde(default = "default_work_root")]
    pub work_root: String,

    /// Folder verified renders are moved into.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Folder for log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_work_root() -> String {
    ".work".to_string()
}

fn default_output_folder() -> String {
    "renders".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            work_root: default_work_root(),
            output_folder: default_output_folder(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Use compact log format.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of engine output lines to show on failure.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Show engine arguments one per line.
    #[serde(default)]
    pub show_options_pretty: bool,

    /// Show engine arguments as a JSON array.
    #[serde(default)]
    pub show_options_json: bool,

    /// Fallback level when `RUST_LOG` is not set.
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    20
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
            show_options_pretty: false,
            show_options_json: false,
            level: default_level(),
        }
    }
}

/// Media engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Transcoder executable.
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: String,

    /// Metadata inspector executable.
    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: String,

    /// Kill a render after this many seconds (0 disables the limit).
    #[serde(default = "default_engine_timeout")]
    pub timeout_secs: u64,

    /// Encoder used when the video is filtered.
    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    #[serde(default = "default_preset")]
    pub preset: String,

    #[serde(default = "default_crf")]
    pub crf: u32,

    #[serde(default = "default_pix_fmt")]
    pub pix_fmt: String,

    /// Encoder used when the audio is filtered.
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Cap new audio at the primary video's duration.
    #[serde(default = "default_true")]
    pub bound_to_video: bool,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_engine_timeout() -> u64 {
    600
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_preset() -> String {
    "veryfast".to_string()
}

fn default_crf() -> u32 {
    23
}

fn default_pix_fmt() -> String {
    "yuv420p".to_string()
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_audio_bitrate() -> String {
    "192k".to_string()
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg(),
            ffprobe_path: default_ffprobe(),
            timeout_secs: default_engine_timeout(),
            video_codec: default_video_codec(),
            preset: default_preset(),
            crf: default_crf(),
            pix_fmt: default_pix_fmt(),
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            bound_to_video: true,
        }
    }
}

/// Remote asset fetching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSettings {
    /// Per-download timeout in seconds.
    #[serde(default = "default_download_timeout")]
    pub timeout_secs: u64,

    /// Downloads running at once within one job.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Reject assets larger than this (0 disables the limit).
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

fn default_download_timeout() -> u64 {
    120
}

fn default_max_concurrent() -> usize {
    4
}

fn default_max_bytes() -> u64 {
    2 * 1024 * 1024 * 1024
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_download_timeout(),
            max_concurrent: default_max_concurrent(),
            max_bytes: default_max_bytes(),
        }
    }
}

/// Caption layout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutSettings {
    #[serde(default = "default_base_divisor")]
    pub base_divisor: u32,

    /// Divisor growth per extra line.
    #[serde(default = "default_compression_factor")]
    pub compression_factor: u32,

    #[serde(default = "default_max_chars")]
    pub max_chars_per_line: usize,

    /// Wrap CJK captions on visual width.
    #[serde(default = "default_true")]
    pub cjk_aware: bool,

    #[serde(default = "default_cjk_ratio")]
    pub cjk_wrap_ratio: f64,

    /// Added to the font size to get the line height.
    #[serde(default = "default_line_padding")]
    pub line_padding: u32,

    #[serde(default = "default_stroke_divisor")]
    pub stroke_divisor: u32,

    #[serde(default = "default_min_stroke")]
    pub min_stroke: u32,

    /// Distance in pixels between a caption block and the frame edge.
    #[serde(default = "default_caption_margin")]
    pub caption_margin: u32,

    #[serde(default = "default_branding_divisor")]
    pub branding_divisor: u32,

    /// Font file for Latin captions (empty uses the engine default).
    #[serde(default)]
    pub font_file: String,

    /// Font file for CJK captions (empty falls back to `font_file`).
    #[serde(default)]
    pub cjk_font_file: String,

    #[serde(default = "default_font_color")]
    pub font_color: String,

    #[serde(default = "default_border_color")]
    pub border_color: String,
}

fn default_base_divisor() -> u32 {
    12
}

fn default_compression_factor() -> u32 {
    2
}

fn default_max_chars() -> usize {
    30
}

fn default_cjk_ratio() -> f64 {
    0.6
}

fn default_line_padding() -> u32 {
    5
}

fn default_stroke_divisor() -> u32 {
    10
}

fn default_min_stroke() -> u32 {
    2
}

fn default_caption_margin() -> u32 {
    40
}

fn default_branding_divisor() -> u32 {
    24
}

fn default_font_color() -> String {
    "white".to_string()
}

fn default_border_color() -> String {
    "black".to_string()
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            base_divisor: default_base_divisor(),
            compression_factor: default_compression_factor(),
            max_chars_per_line: default_max_chars(),
            cjk_aware: true,
            cjk_wrap_ratio: default_cjk_ratio(),
            line_padding: default_line_padding(),
            stroke_divisor: default_stroke_divisor(),
            min_stroke: default_min_stroke(),
            caption_margin: default_caption_margin(),
            branding_divisor: default_branding_divisor(),
            font_file: String::new(),
            cjk_font_file: String::new(),
            font_color: default_font_color(),
            border_color: default_border_color(),
        }
    }
}

/// Audio mix configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Gain applied to dialogue in dB.
    #[serde(default)]
    pub dialogue_gain_db: f64,

    /// Gain applied to background music in dB (ducking).
    #[serde(default = "default_music_gain")]
    pub music_gain_db: f64,

    #[serde(default = "default_fade_in")]
    pub fade_in_secs: f64,

    #[serde(default = "default_fade_out")]
    pub fade_out_secs: f64,

    /// Used when the request does not name a policy.
    #[serde(default)]
    pub mix_duration_policy: MixDurationPolicy,

    /// Mix the video's own audio in when no dialogue is supplied.
    #[serde(default = "default_true")]
    pub keep_original_audio: bool,
}

fn default_music_gain() -> f64 {
    -3.0
}

fn default_fade_in() -> f64 {
    1.0
}

fn default_fade_out() -> f64 {
    2.0
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            dialogue_gain_db: 0.0,
            music_gain_db: default_music_gain(),
            fade_in_secs: default_fade_in(),
            fade_out_secs: default_fade_out(),
            mix_duration_policy: MixDurationPolicy::default(),
            keep_original_audio: true,
        }
    }
}

/// Overlay placement configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverlaySettings {
    /// Used when the request does not name a placement.
    #[serde(default)]
    pub placement: OverlayPlacement,
}

/// Job bookkeeping configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSettings {
    /// Seconds a job status stays queryable after its last update.
    #[serde(default = "default_status_ttl")]
    pub status_ttl_secs: u64,

    /// Variants rendered when the request does not list any.
    #[serde(default = "default_variants")]
    pub default_variants: Vec<Variant>,

    /// Reject requests with neither dialogue nor music.
    #[serde(default)]
    pub require_audio_source: bool,
}

fn default_status_ttl() -> u64 {
    3600
}

fn default_variants() -> Vec<Variant> {
    vec![Variant::WithOverlay, Variant::WithoutOverlay]
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            status_ttl_secs: default_status_ttl(),
            default_variants: default_variants(),
            require_audio_source: false,
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Engine,
    Download,
    Layout,
    Audio,
    Overlay,
    Jobs,
}

impl ConfigSection {
    /// All sections in file order.
    pub const ALL: [ConfigSection; 8] = [
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Engine,
        ConfigSection::Download,
        ConfigSection::Layout,
        ConfigSection::Audio,
        ConfigSection::Overlay,
        ConfigSection::Jobs,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Engine => "engine",
            ConfigSection::Download => "download",
            ConfigSection::Layout => "layout",
            ConfigSection::Audio => "audio",
            ConfigSection::Overlay => "overlay",
            ConfigSection::Jobs => "jobs",
        }
    }

    /// Comment written above the section in generated files.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Work, output and log directories",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Engine => "Media engine executables and encoder options",
            ConfigSection::Download => "Remote asset fetching",
            ConfigSection::Layout => "Caption layout and fonts",
            ConfigSection::Audio => "Audio gains, fades and mix policy",
            ConfigSection::Overlay => "Overlay image placement",
            ConfigSection::Jobs => "Job status retention and default variants",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OverlayCorner;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[engine]"));
        assert!(toml.contains("work_root"));
    }

    #[test]
    fn settings_round_trip() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.paths.output_folder, settings.paths.output_folder);
        assert_eq!(parsed.audio.music_gain_db, -3.0);
        assert_eq!(parsed.overlay.placement, OverlayPlacement::default());
        assert_eq!(parsed.jobs.default_variants, default_variants());
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[paths]\noutput_folder = \"custom_output\"";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        // Custom value preserved
        assert_eq!(parsed.paths.output_folder, "custom_output");
        // Defaults applied for missing
        assert!(parsed.logging.compact);
        assert_eq!(parsed.layout.base_divisor, 12);
        assert_eq!(parsed.audio.mix_duration_policy, MixDurationPolicy::First);
    }

    #[test]
    fn overlay_placement_reads_from_toml() {
        let content = r#"
[overlay.placement]
mode = "corner"
corner = "bottom-right"
margin = 8
"#;
        let parsed: Settings = toml::from_str(content).unwrap();
        assert_eq!(
            parsed.overlay.placement,
            OverlayPlacement::Corner {
                corner: OverlayCorner::BottomRight,
                margin: 8
            }
        );
    }
}
