//! Private per-job working directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A job's private working directory, removed when dropped.
///
/// Downloads and raw engine output live here until verification moves
/// the finished files out, so every exit path leaves nothing behind.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    /// Create `root/job_id`, failing if it already exists.
    pub fn create(root: &Path, job_id: &str) -> io::Result<Self> {
        fs::create_dir_all(root)?;
        let path = root.join(job_id);
        fs::create_dir(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        match fs::remove_dir_all(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!("Failed to remove work directory {}: {}", self.path.display(), e)
            }
        }
    }
}
