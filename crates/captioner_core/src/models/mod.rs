//! Data models for the render service.
//!
//! This module contains the core data structures used throughout the crate:
//! - Enums for media kinds, caption roles, mix policies and variants
//! - Media assets and caption specs
//! - Audio mix plans
//! - Inbound requests (with validation) and outbound responses

mod audio;
mod enums;
mod media;
mod request;
mod results;

// Re-export all public types
pub use audio::{AudioMixPlan, AudioSource, AudioTrack};
pub use enums::{
    CaptionRole, Language, MediaKind, MixDurationPolicy, OverlayCorner, OverlayPlacement, Variant,
};
pub use media::{CaptionSpec, MediaAsset};
pub use request::{
    AssetSlot, CaptionsRequest, JobRequest, RemoteAsset, ValidatedRequest, ValidationError,
    MAX_CAPTION_CHARS,
};
pub use results::{Downloads, JobResponse, RenderStats};
