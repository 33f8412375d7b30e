//! Inbound job request and its validation.
//!
//! Validation runs before any download or probe work so a malformed
//! request is the cheapest possible failure.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::enums::{CaptionRole, Language, MediaKind, MixDurationPolicy, OverlayPlacement, Variant};
use super::media::CaptionSpec;

/// Longest caption text accepted, in characters.
pub const MAX_CAPTION_CHARS: usize = 500;

/// Schemes accepted for asset URLs.
const ALLOWED_SCHEMES: &[&str] = &["http", "https", "file"];

/// Errors raised while validating a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Field '{field}' is not a valid URL: {message}")]
    InvalidUrl { field: &'static str, message: String },

    #[error("Field '{field}' uses unsupported scheme '{scheme}'")]
    UnsupportedScheme { field: &'static str, scheme: String },

    #[error("At least one audio source (dialogue or music) is required")]
    MissingAudioSource,

    #[error("Caption '{role}' is {len} characters long (max {max})")]
    CaptionTooLong {
        role: CaptionRole,
        len: usize,
        max: usize,
    },

    #[error("Variant list is empty")]
    NoVariants,
}

/// Caption texts as sent by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionsRequest {
    #[serde(default)]
    pub top: Option<String>,
    #[serde(default)]
    pub bottom: Option<String>,
    /// Language tag applied to all captions (detected when absent).
    #[serde(default)]
    pub language: Option<String>,
    /// Drawn as the branding caption.
    #[serde(default)]
    pub project_name: Option<String>,
}

/// A render job as submitted by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub dialogue: Option<String>,
    #[serde(default)]
    pub music: Option<String>,
    #[serde(default)]
    pub overlay_image: Option<String>,
    #[serde(default)]
    pub captions: Option<CaptionsRequest>,
    #[serde(default)]
    pub audio_mix_duration_policy: Option<MixDurationPolicy>,
    #[serde(default)]
    pub overlay_placement: Option<OverlayPlacement>,
    #[serde(default)]
    pub variants: Option<Vec<Variant>>,
}

/// Which request field an asset was supplied through.
///
/// Declaration order is the engine input order after the primary video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetSlot {
    Video,
    Dialogue,
    Music,
    OverlayImage,
}

impl AssetSlot {
    /// Kind of media expected in this slot.
    pub fn kind(&self) -> MediaKind {
        match self {
            AssetSlot::Video => MediaKind::Video,
            AssetSlot::Dialogue | AssetSlot::Music => MediaKind::Audio,
            AssetSlot::OverlayImage => MediaKind::Image,
        }
    }

    /// Base file name used inside the job directory.
    pub fn file_stem(&self) -> &'static str {
        match self {
            AssetSlot::Video => "video",
            AssetSlot::Dialogue => "dialogue",
            AssetSlot::Music => "music",
            AssetSlot::OverlayImage => "overlay",
        }
    }
}

impl std::fmt::Display for AssetSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_stem())
    }
}

/// A remote asset to fetch into the job directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAsset {
    pub slot: AssetSlot,
    pub url: Url,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    /// Assets in slot order; the video is always first.
    pub assets: Vec<RemoteAsset>,
    /// Non-blank captions in draw order.
    pub captions: Vec<CaptionSpec>,
    pub mix_policy: Option<MixDurationPolicy>,
    pub overlay_placement: Option<OverlayPlacement>,
    /// Variants to render, deduplicated; `None` means the configured default.
    pub variants: Option<Vec<Variant>>,
}

impl ValidatedRequest {
    /// Look up the asset supplied for a slot.
    pub fn asset(&self, slot: AssetSlot) -> Option<&RemoteAsset> {
        self.assets.iter().find(|a| a.slot == slot)
    }

    /// Whether dialogue or music was supplied.
    pub fn has_audio_source(&self) -> bool {
        self.asset(AssetSlot::Dialogue).is_some() || self.asset(AssetSlot::Music).is_some()
    }
}

impl JobRequest {
    /// Validate the request without touching the network or disk.
    ///
    /// `require_audio` rejects requests with neither dialogue nor music.
    pub fn validate(&self, require_audio: bool) -> Result<ValidatedRequest, ValidationError> {
        let video = non_empty(&self.video).ok_or(ValidationError::MissingField("video"))?;

        let mut assets = vec![RemoteAsset {
            slot: AssetSlot::Video,
            url: parse_asset_url("video", video)?,
        }];
        let optional = [
            (AssetSlot::Dialogue, "dialogue", &self.dialogue),
            (AssetSlot::Music, "music", &self.music),
            (AssetSlot::OverlayImage, "overlayImage", &self.overlay_image),
        ];
        for (slot, field, value) in optional {
            if let Some(raw) = non_empty(value) {
                assets.push(RemoteAsset {
                    slot,
                    url: parse_asset_url(field, raw)?,
                });
            }
        }

        let captions = self.caption_specs()?;

        let validated = ValidatedRequest {
            assets,
            captions,
            mix_policy: self.audio_mix_duration_policy,
            overlay_placement: self.overlay_placement,
            variants: self.dedup_variants()?,
        };

        if require_audio && !validated.has_audio_source() {
            return Err(ValidationError::MissingAudioSource);
        }

        Ok(validated)
    }

    fn caption_specs(&self) -> Result<Vec<CaptionSpec>, ValidationError> {
        let Some(captions) = &self.captions else {
            return Ok(Vec::new());
        };

        let language = captions.language.as_deref().and_then(Language::from_tag);
        let texts = [
            (CaptionRole::Top, &captions.top),
            (CaptionRole::Bottom, &captions.bottom),
            (CaptionRole::Branding, &captions.project_name),
        ];

        let mut specs = Vec::new();
        for (role, text) in texts {
            let Some(text) = text else { continue };
            let len = text.chars().count();
            if len > MAX_CAPTION_CHARS {
                return Err(ValidationError::CaptionTooLong {
                    role,
                    len,
                    max: MAX_CAPTION_CHARS,
                });
            }
            let mut spec = CaptionSpec::new(role, text.clone());
            spec.language = language;
            if !spec.is_blank() {
                specs.push(spec);
            }
        }
        Ok(specs)
    }

    fn dedup_variants(&self) -> Result<Option<Vec<Variant>>, ValidationError> {
        let Some(variants) = &self.variants else {
            return Ok(None);
        };
        if variants.is_empty() {
            return Err(ValidationError::NoVariants);
        }
        let mut unique = variants.clone();
        unique.sort();
        unique.dedup();
        Ok(Some(unique))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_asset_url(field: &'static str, raw: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(raw).map_err(|e| ValidationError::InvalidUrl {
        field,
        message: e.to_string(),
    })?;
    if !ALLOWED_SCHEMES.contains(&url.scheme()) {
        return Err(ValidationError::UnsupportedScheme {
            field,
            scheme: url.scheme().to_string(),
        });
    }
    Ok(url)
}
