//! HTTP(S) and local-file fetcher.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use super::{DownloadError, DownloadResult, Fetcher};
use crate::config::DownloadSettings;

/// [`Fetcher`] for `http`, `https` and `file` URLs.
///
/// Bodies are streamed to a `.part` file next to the destination and
/// renamed into place once complete, so a failed fetch never leaves a
/// truncated asset behind.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    /// Zero disables the limit.
    max_bytes: u64,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_bytes: u64) -> DownloadResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("captioner/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DownloadError::Request {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client, max_bytes })
    }

    pub fn from_settings(settings: &DownloadSettings) -> DownloadResult<Self> {
        Self::new(Duration::from_secs(settings.timeout_secs), settings.max_bytes)
    }

    fn limit(&self) -> Option<u64> {
        (self.max_bytes > 0).then_some(self.max_bytes)
    }

    fn fetch_http(&self, url: &Url, dest: &Path) -> DownloadResult<u64> {
        let request_error = |e: reqwest::Error| DownloadError::Request {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let (Some(limit), Some(length)) = (self.limit(), response.content_length()) {
            if length > limit {
                return Err(DownloadError::TooLarge {
                    url: url.to_string(),
                    max_bytes: limit,
                });
            }
        }

        self.write_limited(url, response, dest)
    }

    fn fetch_file(&self, url: &Url, dest: &Path) -> DownloadResult<u64> {
        let source = url
            .to_file_path()
            .map_err(|_| DownloadError::InvalidFileUrl(url.to_string()))?;
        let file = File::open(&source).map_err(|e| DownloadError::io(&source, e))?;
        self.write_limited(url, file, dest)
    }

    /// Copy `reader` to `dest`, enforcing the size limit.
    fn write_limited(&self, url: &Url, reader: impl Read, dest: &Path) -> DownloadResult<u64> {
        let part = part_path(dest);
        let result = self.copy_to(url, reader, &part);
        match result {
            Ok(bytes) => {
                fs::rename(&part, dest).map_err(|e| DownloadError::io(dest, e))?;
                Ok(bytes)
            }
            Err(e) => {
                let _ = fs::remove_file(&part);
                Err(e)
            }
        }
    }

    fn copy_to(&self, url: &Url, reader: impl Read, part: &Path) -> DownloadResult<u64> {
        let file = File::create(part).map_err(|e| DownloadError::io(part, e))?;
        let mut writer = BufWriter::new(file);

        // One byte past the limit is enough to tell it was exceeded
        let cap = self.limit().map_or(u64::MAX, |limit| limit.saturating_add(1));
        let mut limited = reader.take(cap);
        let bytes = io::copy(&mut limited, &mut writer).map_err(|e| match e.kind() {
            io::ErrorKind::TimedOut => DownloadError::Request {
                url: url.to_string(),
                message: e.to_string(),
            },
            _ => DownloadError::io(part, e),
        })?;
        writer.flush().map_err(|e| DownloadError::io(part, e))?;

        if let Some(limit) = self.limit() {
            if bytes > limit {
                return Err(DownloadError::TooLarge {
                    url: url.to_string(),
                    max_bytes: limit,
                });
            }
        }
        if bytes == 0 {
            return Err(DownloadError::Empty {
                url: url.to_string(),
            });
        }
        Ok(bytes)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &Url, dest: &Path) -> DownloadResult<u64> {
        tracing::info!("Downloading {}", url);
        let bytes = match url.scheme() {
            "file" => self.fetch_file(url, dest)?,
            _ => self.fetch_http(url, dest)?,
        };
        tracing::debug!("Fetched {} bytes to {}", bytes, dest.display());
        Ok(bytes)
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fetcher(max_bytes: u64) -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(5), max_bytes).unwrap()
    }

    #[test]
    fn copies_local_files() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source.mp4");
        fs::write(&source, b"not really a video").unwrap();
        let dest = dir.path().join("video.mp4");

        let url = Url::from_file_path(&source).unwrap();
        let bytes = fetcher(0).fetch(&url, &dest).unwrap();

        assert_eq!(bytes, 18);
        assert_eq!(fs::read(&dest).unwrap(), b"not really a video");
        assert!(!part_path(&dest).exists());
    }

    #[test]
    fn oversized_file_is_rejected_and_removed() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("big.bin");
        fs::write(&source, vec![0u8; 64]).unwrap();
        let dest = dir.path().join("music.mp3");

        let url = Url::from_file_path(&source).unwrap();
        let result = fetcher(32).fetch(&url, &dest);

        assert!(matches!(
            result,
            Err(DownloadError::TooLarge { max_bytes: 32, .. })
        ));
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }

    #[test]
    fn empty_file_is_an_error() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("empty.mp3");
        File::create(&source).unwrap();

        let url = Url::from_file_path(&source).unwrap();
        let result = fetcher(0).fetch(&url, &dir.path().join("music.mp3"));
        assert!(matches!(result, Err(DownloadError::Empty { .. })));
    }

    #[test]
    fn missing_local_file_is_io_error() {
        let dir = tempdir().unwrap();
        let url = Url::from_file_path(dir.path().join("absent.mp4")).unwrap();
        let result = fetcher(0).fetch(&url, &dir.path().join("video.mp4"));
        assert!(matches!(result, Err(DownloadError::Io { .. })));
    }

    #[test]
    fn part_file_sits_next_to_destination() {
        assert_eq!(
            part_path(Path::new("/work/job/video.mp4")),
            PathBuf::from("/work/job/video.mp4.part")
        );
    }
}
