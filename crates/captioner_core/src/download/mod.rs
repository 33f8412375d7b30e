//! Remote asset fetching.
//!
//! Every asset a job references is fetched into the job's private
//! directory before anything else touches it. A single failed download
//! fails the job; there is no partial-input fallback.

mod http;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use thiserror::Error;
use url::Url;

use crate::models::{AssetSlot, RemoteAsset};
use crate::orchestrator::CancelHandle;

pub use http::HttpFetcher;

/// Errors raised while fetching an asset.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Request for {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    #[error("{url} exceeds the {max_bytes} byte limit")]
    TooLarge { url: String, max_bytes: u64 },

    #[error("{url} is empty")]
    Empty { url: String },

    #[error("Not a local file URL: {0}")]
    InvalidFileUrl(String),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Download cancelled")]
    Cancelled,
}

impl DownloadError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for downloads.
pub type DownloadResult<T> = Result<T, DownloadError>;

/// Fetches one URL to a local path.
pub trait Fetcher: Send + Sync {
    /// Fetch `url` into `dest`, returning the number of bytes written.
    fn fetch(&self, url: &Url, dest: &Path) -> DownloadResult<u64>;
}

/// A fetched asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    pub slot: AssetSlot,
    pub path: PathBuf,
    pub bytes: u64,
}

/// Local file name for an asset: the slot name plus the URL's extension.
pub fn local_file_name(asset: &RemoteAsset) -> String {
    let extension = asset
        .url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase);

    match extension {
        Some(ext) => format!("{}.{}", asset.slot.file_stem(), ext),
        None => asset.slot.file_stem().to_string(),
    }
}

/// Fetch all assets into `dest_dir`, at most `max_concurrent` at a time.
///
/// Results come back in the order of `assets`. After the first failure no
/// new download is started and that error is returned.
pub fn download_all(
    fetcher: &dyn Fetcher,
    assets: &[RemoteAsset],
    dest_dir: &Path,
    max_concurrent: usize,
    cancel: &CancelHandle,
) -> DownloadResult<Vec<Downloaded>> {
    let workers = max_concurrent.clamp(1, assets.len().max(1));
    let next = AtomicUsize::new(0);
    let results: Mutex<Vec<Option<Downloaded>>> = Mutex::new(vec![None; assets.len()]);
    let failure: Mutex<Option<DownloadError>> = Mutex::new(None);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                if failure.lock().is_some() {
                    break;
                }
                let index = next.fetch_add(1, Ordering::SeqCst);
                let Some(asset) = assets.get(index) else {
                    break;
                };
                if cancel.is_cancelled() {
                    failure.lock().get_or_insert(DownloadError::Cancelled);
                    break;
                }

                let path = dest_dir.join(local_file_name(asset));
                tracing::debug!("Fetching {} -> {}", asset.url, path.display());
                match fetcher.fetch(&asset.url, &path) {
                    Ok(bytes) => {
                        results.lock()[index] = Some(Downloaded {
                            slot: asset.slot,
                            path,
                            bytes,
                        });
                    }
                    Err(e) => {
                        tracing::warn!("Download of {} failed: {}", asset.slot, e);
                        failure.lock().get_or_insert(e);
                        break;
                    }
                }
            });
        }
    });

    if let Some(err) = failure.into_inner() {
        return Err(err);
    }

    Ok(results.into_inner().into_iter().flatten().collect())
}
