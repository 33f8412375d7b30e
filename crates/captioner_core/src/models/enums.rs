//! Core enums used throughout the render pipeline.

use serde::{Deserialize, Serialize};

/// Kind of media file handled by a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Image => write!(f, "image"),
        }
    }
}

/// Role of a caption in the frame.
///
/// The declaration order is also the draw order: branding is drawn last
/// so it always ends up on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionRole {
    Top,
    Bottom,
    Branding,
}

impl std::fmt::Display for CaptionRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptionRole::Top => write!(f, "top"),
            CaptionRole::Bottom => write!(f, "bottom"),
            CaptionRole::Branding => write!(f, "branding"),
        }
    }
}

/// Script family of a caption, used for font and wrapping choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Latin and other alphabetic scripts.
    #[default]
    Latin,
    Korean,
    Japanese,
    Chinese,
}

impl Language {
    /// Whether this script is laid out with double-width glyphs.
    pub fn is_cjk(&self) -> bool {
        !matches!(self, Language::Latin)
    }

    /// Parse a caller-supplied language tag (ISO 639-1/2 or name).
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "ko" | "kor" | "korean" => Some(Language::Korean),
            "ja" | "jpn" | "japanese" => Some(Language::Japanese),
            "zh" | "zho" | "chi" | "chinese" | "zh-cn" | "zh-tw" => Some(Language::Chinese),
            "en" | "eng" | "english" | "latin" | "fr" | "de" | "es" | "pt" | "it" => {
                Some(Language::Latin)
            }
            _ => None,
        }
    }

    /// Detect the script family from the text itself.
    ///
    /// The first Hangul, Kana or CJK ideograph found decides; text
    /// without any of those is treated as Latin.
    pub fn detect(text: &str) -> Self {
        for c in text.chars() {
            match c as u32 {
                0x1100..=0x11FF | 0x3130..=0x318F | 0xAC00..=0xD7AF => return Language::Korean,
                0x3040..=0x30FF => return Language::Japanese,
                0x4E00..=0x9FFF | 0x3400..=0x4DBF => return Language::Chinese,
                _ => {}
            }
        }
        Language::Latin
    }
}

/// How mismatched audio track lengths resolve when mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MixDurationPolicy {
    /// Output trimmed to the shortest contributing track.
    Shortest,
    /// Output lasts as long as the longest track.
    Longest,
    /// Output matches the first (primary narration) track.
    #[default]
    First,
}

impl MixDurationPolicy {
    /// Value of the engine's mix `duration` option.
    pub fn as_engine_value(&self) -> &'static str {
        match self {
            MixDurationPolicy::Shortest => "shortest",
            MixDurationPolicy::Longest => "longest",
            MixDurationPolicy::First => "first",
        }
    }
}

impl std::fmt::Display for MixDurationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_engine_value())
    }
}

/// Frame corner an overlay image is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayCorner {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Where an overlay image goes on the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum OverlayPlacement {
    /// Anchored to a corner, offset by `margin` pixels from both edges.
    Corner { corner: OverlayCorner, margin: u32 },
    /// Scaled to the full frame and placed at the origin.
    FullFrame,
    /// Scaled to the frame width and anchored to the bottom edge.
    BottomBar,
}

impl Default for OverlayPlacement {
    fn default() -> Self {
        OverlayPlacement::Corner {
            corner: OverlayCorner::default(),
            margin: 20,
        }
    }
}

/// Output variant produced by a render job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Variant {
    /// Overlay image, captions and branding burned in.
    WithOverlay,
    /// Clean video with the mixed audio only.
    WithoutOverlay,
}

impl Variant {
    /// File stem used for the rendered output.
    pub fn file_stem(&self) -> &'static str {
        match self {
            Variant::WithOverlay => "with_overlay",
            Variant::WithoutOverlay => "without_overlay",
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variant::WithOverlay => write!(f, "withOverlay"),
            Variant::WithoutOverlay => write!(f, "withoutOverlay"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_scripts() {
        assert_eq!(Language::detect("HELLO WORLD"), Language::Latin);
        assert_eq!(Language::detect("안녕하세요"), Language::Korean);
        assert_eq!(Language::detect("こんにちは"), Language::Japanese);
        assert_eq!(Language::detect("你好"), Language::Chinese);
        assert_eq!(Language::detect("score: 100 점"), Language::Korean);
    }

    #[test]
    fn parses_language_tags() {
        assert_eq!(Language::from_tag("KO"), Some(Language::Korean));
        assert_eq!(Language::from_tag("jpn"), Some(Language::Japanese));
        assert_eq!(Language::from_tag("en"), Some(Language::Latin));
        assert_eq!(Language::from_tag("klingon"), None);
    }

    #[test]
    fn role_order_puts_branding_last() {
        assert!(CaptionRole::Top < CaptionRole::Bottom);
        assert!(CaptionRole::Bottom < CaptionRole::Branding);
    }

    #[test]
    fn placement_deserializes_tagged() {
        let json = r#"{"mode":"corner","corner":"bottom-left","margin":12}"#;
        let placement: OverlayPlacement = serde_json::from_str(json).unwrap();
        assert_eq!(
            placement,
            OverlayPlacement::Corner {
                corner: OverlayCorner::BottomLeft,
                margin: 12
            }
        );

        let bar: OverlayPlacement = serde_json::from_str(r#"{"mode":"bottomBar"}"#).unwrap();
        assert_eq!(bar, OverlayPlacement::BottomBar);
    }

    #[test]
    fn policy_serializes_lowercase() {
        let json = serde_json::to_string(&MixDurationPolicy::Longest).unwrap();
        assert_eq!(json, "\"longest\"");
    }
}
