//! Job status tracking.
//!
//! This module provides:
//! - `JobPhase`: lifecycle position of a render job
//! - `JobStatusRecord`: last known state of a job, with its final response
//! - `JobStore`: keyed status storage with expiry
//! - `InMemoryJobStore`: process-local store

mod store;
mod types;

pub use store::{InMemoryJobStore, JobStore};
pub use types::{JobPhase, JobStatusRecord};
