//! Per-job log file.
//!
//! Every line goes to the job's own file, to an optional callback, and
//! is mirrored into `tracing` tagged with the job id. Engine output is
//! additionally kept in a bounded tail so a failure can be reported with
//! the last lines the engine printed.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

/// Mutable parts of a logger, behind one lock.
struct LoggerState {
    writer: Option<BufWriter<File>>,
    tail: VecDeque<String>,
    last_progress: Option<u32>,
}

/// Logger owned by a single job.
pub struct JobLogger {
    job_id: String,
    log_path: PathBuf,
    config: LogConfig,
    callback: Option<LogCallback>,
    state: Mutex<LoggerState>,
}

impl JobLogger {
    /// Create `<log_dir>/<job_id>.log`, truncating any previous file.
    pub fn new(
        job_id: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> std::io::Result<Self> {
        let job_id = job_id.into();
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", sanitize_filename(&job_id)));
        let file = File::create(&log_path)?;
        let tail = VecDeque::with_capacity(config.error_tail);

        Ok(Self {
            job_id,
            log_path,
            config,
            callback,
            state: Mutex::new(LoggerState {
                writer: Some(BufWriter::new(file)),
                tail,
                last_progress: None,
            }),
        })
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Log a message at the specified level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }
        self.mirror(level, message);
        self.write_line(message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, &MessagePrefix::Warning.format(message));
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, &MessagePrefix::Error.format(message));
    }

    /// Log an engine command line before it runs.
    pub fn command(&self, command: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Command.format(command));
    }

    /// Mark the start of a job phase.
    pub fn phase(&self, phase_name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Phase.format(phase_name));
    }

    pub fn section(&self, section_name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Section.format(section_name));
    }

    pub fn success(&self, message: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Success.format(message));
    }

    /// Log render progress.
    ///
    /// In compact mode only the first value past each `progress_step`
    /// boundary is written, plus 100. Returns whether a line was written.
    pub fn progress(&self, percent: u32) -> bool {
        let percent = percent.min(100);
        if self.config.compact {
            let step = self.config.progress_step.max(1);
            let mut state = self.state.lock();
            let crossed = match state.last_progress {
                None => true,
                Some(last) => percent / step > last / step || (percent == 100 && last < 100),
            };
            if !crossed {
                return false;
            }
            state.last_progress = Some(percent);
        }

        self.info(&format!("Progress: {}%", percent));
        true
    }

    /// Record one line of engine output.
    ///
    /// The line always enters the tail buffer; it is written to the log
    /// only outside compact mode.
    pub fn output_line(&self, line: &str, is_stderr: bool) {
        let limit = self.config.error_tail;
        if limit > 0 {
            let mut state = self.state.lock();
            while state.tail.len() >= limit {
                state.tail.pop_front();
            }
            state.tail.push_back(line.to_string());
        }

        if !self.config.compact {
            let stream = if is_stderr { "[stderr] " } else { "" };
            self.write_line(&format!("{}{}", stream, line));
        }
    }

    /// Write the tail buffer under a header, typically after a failure.
    pub fn show_tail(&self, header: &str) {
        let lines = self.get_tail();
        if lines.is_empty() {
            return;
        }
        self.write_line(&format!("[{}/tail]", header));
        for line in &lines {
            self.write_line(line);
        }
    }

    pub fn clear_tail(&self) {
        self.state.lock().tail.clear();
    }

    pub fn get_tail(&self) -> Vec<String> {
        self.state.lock().tail.iter().cloned().collect()
    }

    /// Log engine arguments one per line, shell-continuation style.
    pub fn log_engine_args_pretty(&self, program: &str, args: &[String]) {
        let body = args
            .iter()
            .fold(program.to_string(), |acc, arg| format!("{} \\\n  {}", acc, arg));
        self.info(&MessagePrefix::Section.format("engine arguments"));
        self.info(&body);
    }

    /// Log engine arguments as a JSON array.
    pub fn log_engine_args_json(&self, args: &[String]) {
        match serde_json::to_string_pretty(args) {
            Ok(json) => {
                self.info(&MessagePrefix::Section.format("engine arguments (json)"));
                self.info(&json);
            }
            Err(e) => self.warn(&format!("Could not serialize engine arguments: {}", e)),
        }
    }

    pub fn flush(&self) {
        if let Some(writer) = self.state.lock().writer.as_mut() {
            let _ = writer.flush();
        }
    }

    fn write_line(&self, message: &str) {
        let line = if self.config.show_timestamps {
            format!("[{}] {}", Local::now().format("%H:%M:%S"), message)
        } else {
            message.to_string()
        };

        if let Some(writer) = self.state.lock().writer.as_mut() {
            let _ = writeln!(writer, "{}", line);
        }
        if let Some(callback) = &self.callback {
            callback(&line);
        }
    }

    fn mirror(&self, level: LogLevel, message: &str) {
        let job = self.job_id.as_str();
        match level {
            LogLevel::Trace => tracing::trace!(job = job, "{}", message),
            LogLevel::Debug => tracing::debug!(job = job, "{}", message),
            LogLevel::Info => tracing::info!(job = job, "{}", message),
            LogLevel::Warn => tracing::warn!(job = job, "{}", message),
            LogLevel::Error => tracing::error!(job = job, "{}", message),
        }
    }
}

impl Drop for JobLogger {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if let Some(mut writer) = state.writer.take() {
            let _ = writer.flush();
        }
    }
}

/// Replace characters that are not allowed in file names.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn plain() -> LogConfig {
        LogConfig {
            show_timestamps: false,
            ..Default::default()
        }
    }

    #[test]
    fn writes_phase_markers_to_file() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::new("job-1", dir.path(), plain(), None).unwrap();

        logger.phase("Probing");
        logger.flush();

        assert!(logger.log_path().ends_with("job-1.log"));
        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert_eq!(content, "=== Probing ===\n");
    }

    #[test]
    fn callback_sees_only_enabled_levels() {
        let dir = tempdir().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&count);
        let callback: LogCallback = Box::new(move |_line| {
            sink.fetch_add(1, Ordering::SeqCst);
        });
        let logger = JobLogger::new("job-1", dir.path(), plain(), Some(callback)).unwrap();

        logger.info("Message 1");
        logger.debug("filtered at info level");
        logger.info("Message 2");

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn compact_mode_filters_progress() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            compact: true,
            progress_step: 20,
            ..plain()
        };
        let logger = JobLogger::new("job-1", dir.path(), config, None).unwrap();

        assert!(logger.progress(5));
        assert!(!logger.progress(15));
        assert!(logger.progress(20));
        assert!(!logger.progress(25));
        assert!(logger.progress(40));
        assert!(logger.progress(100));
        assert!(!logger.progress(100));
    }

    #[test]
    fn tail_keeps_last_lines_only() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            compact: true,
            error_tail: 5,
            ..plain()
        };
        let logger = JobLogger::new("job-1", dir.path(), config, None).unwrap();

        for i in 0..10 {
            logger.output_line(&format!("frame={}", i), true);
        }

        let tail = logger.get_tail();
        assert_eq!(tail.len(), 5);
        assert_eq!(tail[0], "frame=5");
        assert_eq!(tail[4], "frame=9");

        logger.clear_tail();
        assert!(logger.get_tail().is_empty());
    }

    #[test]
    fn failure_tail_lands_in_file() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::new("job-1", dir.path(), plain(), None).unwrap();

        logger.output_line("Error opening filters!", true);
        logger.show_tail("ffmpeg output");
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("[ffmpeg output/tail]\nError opening filters!"));
    }

    #[test]
    fn logs_engine_args_as_json() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::new("job-1", dir.path(), plain(), None).unwrap();

        logger.log_engine_args_json(&["-y".to_string(), "-i".to_string()]);
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("\"-y\""));
    }

    #[test]
    fn sanitizes_filename() {
        assert_eq!(sanitize_filename("normal_name"), "normal_name");
        assert_eq!(sanitize_filename("has/slash"), "has_slash");
        assert_eq!(sanitize_filename("a<b>c"), "a_b_c");
    }
}
