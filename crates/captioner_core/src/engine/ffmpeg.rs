//! Engine runner backed by the ffmpeg executable.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use super::{is_progress_line, EngineCommand, EngineError, EngineResult, MediaEngine, RunControl};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// [`MediaEngine`] that spawns ffmpeg and streams its stderr.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    program: PathBuf,
    /// Stderr lines kept for the failure message.
    tail_lines: usize,
}

impl FfmpegEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            tail_lines: 20,
        }
    }

    pub fn with_tail_lines(mut self, lines: usize) -> Self {
        self.tail_lines = lines.max(1);
        self
    }

    fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ffmpeg".to_string())
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

/// Last diagnostic lines of the engine's error stream.
struct StderrTail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl StderrTail {
    fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn drain(&mut self, rx: &Receiver<String>, on_line: &dyn Fn(&str)) {
        for line in rx.try_iter() {
            on_line(&line);
            if is_progress_line(&line) {
                continue;
            }
            if self.lines.len() >= self.capacity {
                self.lines.pop_front();
            }
            self.lines.push_back(line);
        }
    }

    fn text(&self) -> String {
        self.lines.iter().cloned().collect::<Vec<_>>().join("\n")
    }
}

fn stop(child: &mut Child, reader: Option<thread::JoinHandle<()>>) {
    let _ = child.kill();
    let _ = child.wait();
    if let Some(handle) = reader {
        let _ = handle.join();
    }
}

impl MediaEngine for FfmpegEngine {
    fn program(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    fn run(
        &self,
        command: &EngineCommand,
        control: &RunControl,
        on_line: &dyn Fn(&str),
    ) -> EngineResult<()> {
        if control.cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        tracing::debug!("Running {} for {}", self.tool_name(), command.variant);

        let mut child = Command::new(&self.program)
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EngineError::SpawnFailed {
                tool: self.tool_name(),
                message: e.to_string(),
            })?;

        let (tx, rx) = mpsc::channel();
        let reader = child.stderr.take().map(|stderr| {
            thread::spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            })
        });

        let started = Instant::now();
        let mut tail = StderrTail::new(self.tail_lines);

        let status = loop {
            tail.drain(&rx, on_line);

            if let Some(status) = child.try_wait()? {
                break status;
            }

            if control.cancel.is_cancelled() {
                tracing::info!("Killing {} after cancellation", self.tool_name());
                stop(&mut child, reader);
                return Err(EngineError::Cancelled);
            }

            if let Some(limit) = control.timeout {
                if started.elapsed() > limit {
                    tracing::warn!(
                        "Killing {} after {}s timeout",
                        self.tool_name(),
                        limit.as_secs()
                    );
                    stop(&mut child, reader);
                    tail.drain(&rx, on_line);
                    return Err(EngineError::TimedOut {
                        tool: self.tool_name(),
                        secs: limit.as_secs(),
                        stderr: tail.text(),
                    });
                }
            }

            thread::sleep(POLL_INTERVAL);
        };

        // The reader ends at EOF once the process has exited
        if let Some(handle) = reader {
            let _ = handle.join();
        }
        tail.drain(&rx, on_line);

        if status.success() {
            Ok(())
        } else {
            Err(EngineError::Failed {
                tool: self.tool_name(),
                exit_code: status.code(),
                stderr: tail.text(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Variant;
    use crate::orchestrator::CancelHandle;

    fn command() -> EngineCommand {
        EngineCommand {
            variant: Variant::WithoutOverlay,
            inputs: vec![PathBuf::from("/nonexistent/video.mp4")],
            filter_graph: None,
            maps: vec!["0:v".to_string(), "0:a?".to_string()],
            codec_args: vec!["-c:v".to_string(), "copy".to_string()],
            output: PathBuf::from("/nonexistent/out.mp4"),
            expected_duration: None,
        }
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let engine = FfmpegEngine::new("/nonexistent/bin/ffmpeg-missing");
        let result = engine.run(&command(), &RunControl::default(), &|_| {});
        assert!(matches!(result, Err(EngineError::SpawnFailed { .. })));
    }

    #[test]
    fn cancelled_before_start_does_not_spawn() {
        let cancel = CancelHandle::new();
        cancel.cancel();
        let engine = FfmpegEngine::new("/nonexistent/bin/ffmpeg-missing");
        let result = engine.run(&command(), &RunControl::new(None, cancel), &|_| {});
        assert!(matches!(result, Err(EngineError::Cancelled)));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_a_failure() {
        // `false` ignores its arguments and exits with status 1
        let engine = FfmpegEngine::new("false");
        let result = engine.run(&command(), &RunControl::default(), &|_| {});
        match result {
            Err(EngineError::Failed {
                tool, exit_code, ..
            }) => {
                assert_eq!(tool, "false");
                assert_eq!(exit_code, Some(1));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    /// A stand-in engine that ignores its arguments and never finishes.
    #[cfg(unix)]
    fn sleeper(dir: &std::path::Path) -> FfmpegEngine {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("sleeper.sh");
        std::fs::write(&script, "#!/bin/sh\nexec sleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        FfmpegEngine::new(script)
    }

    /// Run, retrying while a concurrent fork still holds the script open.
    #[cfg(unix)]
    fn run_sleeper(engine: &FfmpegEngine, control: &RunControl) -> EngineResult<()> {
        for _ in 0..20 {
            match engine.run(&command(), control, &|_| {}) {
                Err(EngineError::SpawnFailed { .. }) => thread::sleep(Duration::from_millis(50)),
                other => return other,
            }
        }
        engine.run(&command(), control, &|_| {})
    }

    #[cfg(unix)]
    #[test]
    fn long_run_is_killed_on_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let engine = sleeper(dir.path());
        let control = RunControl::new(Some(Duration::from_millis(200)), CancelHandle::new());

        let started = Instant::now();
        let result = run_sleeper(&engine, &control);

        assert!(matches!(result, Err(EngineError::TimedOut { .. })), "got {:?}", result);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn long_run_is_killed_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let engine = sleeper(dir.path());
        let cancel = CancelHandle::new();
        let control = RunControl::new(None, cancel.clone());

        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            cancel.cancel();
        });
        let started = Instant::now();
        let result = run_sleeper(&engine, &control);
        canceller.join().unwrap();

        assert!(matches!(result, Err(EngineError::Cancelled)), "got {:?}", result);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn tail_keeps_last_lines() {
        let (tx, rx) = mpsc::channel();
        for i in 0..5 {
            tx.send(format!("line {}", i)).unwrap();
            tx.send(format!("out_time_ms={}", i)).unwrap();
        }
        let seen = std::cell::RefCell::new(Vec::new());
        let mut tail = StderrTail::new(2);
        tail.drain(&rx, &|line| seen.borrow_mut().push(line.to_string()));
        assert_eq!(tail.text(), "line 3\nline 4");
        assert_eq!(seen.borrow().len(), 10);
    }
}
