//! Media asset and caption structures.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::enums::{CaptionRole, Language, MediaKind};

/// One input or output file on disk.
///
/// Metadata fields start empty and are filled in once by the probe step,
/// then reused for the rest of the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    /// Local path of the file.
    pub path: PathBuf,
    /// Kind of media.
    pub kind: MediaKind,
    /// Duration in seconds (from probe).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    /// Frame width in pixels (from probe).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Frame height in pixels (from probe).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Whether the file carries an audio stream (from probe).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_audio_stream: Option<bool>,
}

impl MediaAsset {
    /// Create an asset with no metadata yet.
    pub fn new(path: impl Into<PathBuf>, kind: MediaKind) -> Self {
        Self {
            path: path.into(),
            kind,
            duration_secs: None,
            width: None,
            height: None,
            has_audio_stream: None,
        }
    }

    /// Get the asset path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the probe step has populated this asset.
    pub fn is_probed(&self) -> bool {
        self.duration_secs.is_some() || self.has_audio_stream.is_some()
    }

    /// Frame dimensions, if known.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        }
    }

    /// Audio presence, treating "unknown" as absent.
    pub fn has_audio(&self) -> bool {
        self.has_audio_stream.unwrap_or(false)
    }
}

/// A caption to burn into the frame.
///
/// `text` is always the caller's plain text. It is never pre-escaped;
/// escaping happens once, when the filter graph is serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionSpec {
    /// Plain caption text.
    pub text: String,
    /// Where the caption goes.
    pub role: CaptionRole,
    /// Script family, if the caller specified one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
}

impl CaptionSpec {
    /// Create a caption with no explicit language.
    pub fn new(role: CaptionRole, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            role,
            language: None,
        }
    }

    /// Set the language.
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    /// Whether the caption has nothing visible to draw.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// The specified language, or the one detected from the text.
    pub fn effective_language(&self) -> Language {
        self.language.unwrap_or_else(|| Language::detect(&self.text))
    }
}
