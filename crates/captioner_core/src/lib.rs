//! Captioner Core - backend logic for the caption render service
//!
//! This crate turns a structured render request (base video, optional
//! dialogue/music tracks, optional overlay image, caption texts) into
//! media engine invocations and verified output files. It has no HTTP or
//! CLI dependencies; front ends drive it through [`orchestrator::Orchestrator`].

pub mod config;
pub mod download;
pub mod engine;
pub mod filtergraph;
pub mod jobs;
pub mod layout;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod probe;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
