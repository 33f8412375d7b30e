//! External media engine invocation.
//!
//! [`EngineCommand`] describes a transcode, [`MediaEngine`] runs it.
//! [`FfmpegEngine`] is the production runner; tests substitute their own.

mod command;
mod ffmpeg;

use std::time::Duration;

use thiserror::Error;

use crate::orchestrator::CancelHandle;

pub use command::{EncodeOptions, EngineCommand};
pub use ffmpeg::FfmpegEngine;

/// Errors raised by an engine run.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to start {tool}: {message}")]
    SpawnFailed { tool: String, message: String },

    /// Non-zero exit. `stderr` is the tail of the engine's error stream.
    #[error("{tool} exited with {}: {stderr}", exit_label(.exit_code))]
    Failed {
        tool: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("{tool} timed out after {secs}s: {stderr}")]
    TimedOut {
        tool: String,
        secs: u64,
        stderr: String,
    },

    #[error("Render cancelled")]
    Cancelled,

    #[error("I/O error while running engine: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "a signal".to_string(),
    }
}

/// Result type for engine runs.
pub type EngineResult<T> = Result<T, EngineError>;

/// Limits applied to one engine run.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    /// Kill the process after this long.
    pub timeout: Option<Duration>,
    pub cancel: CancelHandle,
}

impl RunControl {
    pub fn new(timeout: Option<Duration>, cancel: CancelHandle) -> Self {
        Self { timeout, cancel }
    }
}

/// Something that can execute an [`EngineCommand`].
pub trait MediaEngine: Send + Sync {
    /// Program name shown in logs.
    fn program(&self) -> String;

    /// Run the command to completion.
    ///
    /// Every line the engine writes to its error stream is passed to
    /// `on_line` as it arrives.
    fn run(
        &self,
        command: &EngineCommand,
        control: &RunControl,
        on_line: &dyn Fn(&str),
    ) -> EngineResult<()>;
}

/// Whether a stderr line is a `-progress` key/value report rather than
/// a diagnostic.
pub fn is_progress_line(line: &str) -> bool {
    match line.split_once('=') {
        Some((key, value)) => {
            !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Output position in seconds from an `out_time=HH:MM:SS.micros` report.
pub fn out_time_secs(line: &str) -> Option<f64> {
    let value = line.strip_prefix("out_time=")?;
    let mut parts = value.splitn(3, ':');
    let h: f64 = parts.next()?.parse().ok()?;
    let m: f64 = parts.next()?.parse().ok()?;
    let s: f64 = parts.next()?.parse().ok()?;
    Some(h * 3600.0 + m * 60.0 + s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_reports_are_recognized() {
        assert!(is_progress_line("out_time=00:00:05.200000"));
        assert!(is_progress_line("progress=continue"));
        assert!(is_progress_line("bitrate=N/A"));
        assert!(!is_progress_line("frame=  100 fps=30 time=00:01:23.45"));
        assert!(!is_progress_line("[Parsed_drawtext_0 @ 0x55] Cannot find a valid font"));
        assert!(!is_progress_line("Error opening output files: Invalid argument"));
    }

    #[test]
    fn out_time_parses_to_seconds() {
        let secs = out_time_secs("out_time=00:01:23.450000").unwrap();
        assert!((secs - 83.45).abs() < 1e-9);
        assert_eq!(out_time_secs("out_time=N/A"), None);
        assert_eq!(out_time_secs("total_size=1024"), None);
    }

    #[test]
    fn failure_message_carries_stderr() {
        let err = EngineError::Failed {
            tool: "ffmpeg".to_string(),
            exit_code: Some(1),
            stderr: "No such filter: 'drawtxt'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "ffmpeg exited with code 1: No such filter: 'drawtxt'"
        );

        let killed = EngineError::Failed {
            tool: "ffmpeg".to_string(),
            exit_code: None,
            stderr: String::new(),
        };
        assert!(killed.to_string().contains("a signal"));
    }
}
