//! End-to-end render jobs driven through the orchestrator with in-process
//! stand-ins for the network, ffprobe and ffmpeg.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tempfile::{tempdir, TempDir};
use url::Url;

use captioner_core::config::Settings;
use captioner_core::download::{DownloadResult, Fetcher};
use captioner_core::engine::{EngineCommand, EngineError, EngineResult, MediaEngine, RunControl};
use captioner_core::jobs::{InMemoryJobStore, JobPhase};
use captioner_core::models::{CaptionsRequest, JobRequest, JobResponse, Variant};
use captioner_core::orchestrator::{Orchestrator, Services};
use captioner_core::probe::{MediaProbe, ProbeError, ProbeInfo, ProbeResult};

const RENDERED: &[u8] = b"rendered output";

#[derive(Default)]
struct FakeFetcher {
    calls: AtomicUsize,
}

impl Fetcher for FakeFetcher {
    fn fetch(&self, url: &Url, dest: &Path) -> DownloadResult<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = url.as_str().as_bytes();
        fs::write(dest, body).unwrap();
        Ok(body.len() as u64)
    }
}

/// Answers by file stem, the way the job directory names its files.
struct FakeProbe;

impl MediaProbe for FakeProbe {
    fn probe(&self, path: &Path) -> ProbeResult<ProbeInfo> {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        match stem {
            "video" => Ok(ProbeInfo {
                duration_secs: 15.0,
                width: Some(1280),
                height: Some(720),
                has_video_stream: true,
                has_audio_stream: false,
            }),
            "music" => Ok(ProbeInfo {
                duration_secs: 60.0,
                has_audio_stream: true,
                ..Default::default()
            }),
            "with_overlay" | "without_overlay" => Ok(ProbeInfo {
                duration_secs: 15.0,
                width: Some(1280),
                height: Some(720),
                has_video_stream: true,
                has_audio_stream: true,
            }),
            _ => Err(ProbeError::FileNotFound(path.to_path_buf())),
        }
    }
}

#[derive(Default)]
struct FakeEngine {
    commands: Mutex<Vec<EngineCommand>>,
    fail: bool,
}

impl MediaEngine for FakeEngine {
    fn program(&self) -> String {
        "ffmpeg".to_string()
    }

    fn run(
        &self,
        command: &EngineCommand,
        _control: &RunControl,
        on_line: &dyn Fn(&str),
    ) -> EngineResult<()> {
        self.commands.lock().push(command.clone());
        if self.fail {
            on_line("Invalid argument");
            return Err(EngineError::Failed {
                tool: "ffmpeg".to_string(),
                exit_code: Some(1),
                stderr: "Invalid argument".to_string(),
            });
        }
        fs::write(command.output(), RENDERED)?;
        Ok(())
    }
}

struct Harness {
    _root: TempDir,
    settings: Settings,
    fetcher: Arc<FakeFetcher>,
    engine: Arc<FakeEngine>,
}

impl Harness {
    fn new(engine: FakeEngine) -> Self {
        let root = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.paths.work_root = root.path().join("work").display().to_string();
        settings.paths.output_folder = root.path().join("out").display().to_string();
        settings.paths.logs_folder = root.path().join("logs").display().to_string();
        Self {
            _root: root,
            settings,
            fetcher: Arc::new(FakeFetcher::default()),
            engine: Arc::new(engine),
        }
    }

    fn orchestrator(&self) -> Orchestrator {
        let services = Services::new(self.fetcher.clone(), Arc::new(FakeProbe), self.engine.clone());
        let store = InMemoryJobStore::new(Duration::from_secs(60));
        Orchestrator::new(self.settings.clone(), services, Arc::new(store))
    }

    fn work_root_entries(&self) -> usize {
        fs::read_dir(&self.settings.paths.work_root)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

fn silent_video_with_music() -> JobRequest {
    JobRequest {
        video: Some("https://cdn.example.com/clips/silent.mp4".to_string()),
        music: Some("https://cdn.example.com/audio/bed.mp3".to_string()),
        captions: Some(CaptionsRequest {
            top: Some("HELLO WORLD".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[test]
fn silent_video_with_music_renders_both_variants() {
    let harness = Harness::new(FakeEngine::default());
    let orchestrator = harness.orchestrator();

    let response = orchestrator.run(&silent_video_with_music());

    let JobResponse::Success {
        job_id,
        downloads,
        stats,
        ..
    } = &response
    else {
        panic!("job failed: {:?}", response);
    };
    assert_eq!(harness.fetcher.calls.load(Ordering::SeqCst), 2);

    let with_overlay = downloads.with_overlay.as_ref().unwrap();
    let without_overlay = downloads.without_overlay.as_ref().unwrap();
    assert_eq!(fs::read(with_overlay).unwrap(), RENDERED);
    assert_eq!(fs::read(without_overlay).unwrap(), RENDERED);
    assert!(with_overlay.starts_with(Path::new(&harness.settings.paths.output_folder).join(job_id)));
    assert_eq!(stats.duration_seconds, 15.0);
    assert_eq!(stats.file_size_bytes, RENDERED.len() as u64);

    let commands = harness.engine.commands.lock();
    assert_eq!(commands.len(), 2);

    let overlay_cmd = commands
        .iter()
        .find(|c| c.variant == Variant::WithOverlay)
        .unwrap();
    let graph = overlay_cmd.filter_graph.as_deref().unwrap();
    assert_eq!(graph.matches("drawtext=").count(), 1);
    assert!(graph.contains("text='HELLO WORLD'"));
    assert!(graph.contains("fontsize=60"));
    assert!(graph.contains("atrim=end=15.000"));

    let clean_cmd = commands
        .iter()
        .find(|c| c.variant == Variant::WithoutOverlay)
        .unwrap();
    let clean_graph = clean_cmd.filter_graph.as_deref().unwrap();
    assert!(!clean_graph.contains("drawtext"));
    assert!(clean_graph.contains("atrim=end=15.000"));
    assert!(clean_cmd.args().windows(2).any(|w| w[0] == "-c:v" && w[1] == "copy"));

    let record = orchestrator.store().get(job_id).unwrap();
    assert_eq!(record.phase, JobPhase::Complete);
    assert_eq!(harness.work_root_entries(), 0);
}

#[test]
fn missing_video_fails_before_any_download() {
    let harness = Harness::new(FakeEngine::default());
    let orchestrator = harness.orchestrator();
    let mut request = silent_video_with_music();
    request.video = None;

    let response = orchestrator.run(&request);

    match &response {
        JobResponse::Failure { stage, error, .. } => {
            assert_eq!(stage, "Validating");
            assert!(error.contains("video"), "unexpected error: {}", error);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(harness.fetcher.calls.load(Ordering::SeqCst), 0);
    assert!(harness.engine.commands.lock().is_empty());
    assert_eq!(harness.work_root_entries(), 0);

    let record = orchestrator.store().get(response.job_id()).unwrap();
    assert_eq!(record.phase, JobPhase::Failed);
    assert_eq!(record.failed_stage.as_deref(), Some("Validating"));
}

#[test]
fn engine_failure_reports_stderr_and_publishes_nothing() {
    let harness = Harness::new(FakeEngine {
        fail: true,
        ..Default::default()
    });
    let orchestrator = harness.orchestrator();

    let response = orchestrator.run(&silent_video_with_music());

    match &response {
        JobResponse::Failure { stage, error, .. } => {
            assert_eq!(stage, "Rendering");
            assert!(error.contains("Invalid argument"), "unexpected error: {}", error);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    // Stops at the first variant
    assert_eq!(harness.engine.commands.lock().len(), 1);
    assert!(!Path::new(&harness.settings.paths.output_folder)
        .join(response.job_id())
        .exists());
    assert_eq!(harness.work_root_entries(), 0);
}
