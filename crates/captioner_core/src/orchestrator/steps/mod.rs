//! Pipeline step implementations.
//!
//! Each step handles one phase of a render job.

mod build;
mod download;
mod probe;
mod render;
mod verify;

pub use build::BuildStep;
pub use download::DownloadStep;
pub use probe::ProbeStep;
pub use render::RenderStep;
pub use verify::VerifyStep;
