//! captioner - command-line front end for the render core.
//!
//! # Usage
//!
//! ```bash
//! # Render a job request and print the JSON response
//! captioner render request.json
//!
//! # Inspect a media file
//! captioner probe clip.mp4
//!
//! # Print the engine commands a request would run, without rendering
//! captioner graph request.json --width 1280 --height 720 --duration 15
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use captioner_core::config::{ConfigManager, Settings};
use captioner_core::download::local_file_name;
use captioner_core::engine::{EncodeOptions, EngineCommand};
use captioner_core::filtergraph::{GraphComposer, RenderInputs};
use captioner_core::jobs::JobPhase;
use captioner_core::logging::{init_tracing, LogLevel};
use captioner_core::models::{AssetSlot, JobRequest, MediaAsset};
use captioner_core::orchestrator::{CancelHandle, Orchestrator};
use captioner_core::probe::{FfprobeProbe, MediaProbe};

#[derive(Debug, Parser)]
#[command(name = "captioner")]
#[command(author, version, about = "Burn captions into short videos", long_about = None)]
struct Cli {
    /// Settings file; created with defaults when missing
    #[arg(short, long, default_value = "captioner.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a job request end to end
    Render {
        /// JSON job request
        request: PathBuf,
    },
    /// Print the probed metadata of a media file
    Probe {
        file: PathBuf,
    },
    /// Print the engine command lines for a request without rendering
    Graph {
        /// JSON job request
        request: PathBuf,
        /// Frame width of the primary video
        #[arg(long)]
        width: u32,
        /// Frame height of the primary video
        #[arg(long)]
        height: u32,
        /// Duration of the primary video in seconds
        #[arg(long, default_value_t = 10.0)]
        duration: f64,
        /// Duration of the dialogue and music tracks; defaults to the video's
        #[arg(long)]
        audio_duration: Option<f64>,
        /// Treat the primary video as carrying its own audio stream
        #[arg(long)]
        video_audio: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigManager::new(&cli.config);
    config
        .load_or_create()
        .with_context(|| format!("loading settings from {}", cli.config.display()))?;
    let settings = config.settings().clone();
    init_tracing(LogLevel::from_name(&settings.logging.level).unwrap_or(LogLevel::Info));

    match cli.command {
        Commands::Render { request } => {
            config.ensure_dirs_exist()?;
            run_render(settings, &request)
        }
        Commands::Probe { file } => run_probe(&settings, &file),
        Commands::Graph {
            request,
            width,
            height,
            duration,
            audio_duration,
            video_audio,
        } => run_graph(
            &settings,
            &request,
            (width, height),
            duration,
            audio_duration.unwrap_or(duration),
            video_audio,
        ),
    }
}

fn read_request(path: &Path) -> Result<JobRequest> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn run_render(settings: Settings, request_path: &Path) -> Result<()> {
    let request = read_request(request_path)?;
    let orchestrator = Orchestrator::from_settings(settings)?;

    let response = orchestrator.run_with_cancel(
        &request,
        CancelHandle::new(),
        Some(Box::new(|phase: JobPhase, percent: u32, message: &str| {
            tracing::info!("[{:>3}%] {}: {}", percent, phase, message);
        })),
    );

    println!("{}", serde_json::to_string_pretty(&response)?);
    if !response.is_success() {
        bail!("job {} failed", response.job_id());
    }
    Ok(())
}

fn run_probe(settings: &Settings, file: &Path) -> Result<()> {
    let probe = FfprobeProbe::new(&settings.engine.ffprobe_path);
    let info = probe.probe(file)?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn run_graph(
    settings: &Settings,
    request_path: &Path,
    (width, height): (u32, u32),
    duration: f64,
    audio_duration: f64,
    video_audio: bool,
) -> Result<()> {
    let request = read_request(request_path)?
        .validate(settings.jobs.require_audio_source)
        .context("request rejected")?;

    // Stand-in metadata in place of downloading and probing
    let asset = |slot: AssetSlot| {
        request.asset(slot).map(|remote| {
            let mut media = MediaAsset::new(local_file_name(remote), slot.kind());
            match slot {
                AssetSlot::Video => {
                    media.width = Some(width);
                    media.height = Some(height);
                    media.duration_secs = Some(duration);
                    media.has_audio_stream = Some(video_audio);
                }
                AssetSlot::Dialogue | AssetSlot::Music => {
                    media.duration_secs = Some(audio_duration);
                    media.has_audio_stream = Some(true);
                }
                AssetSlot::OverlayImage => {}
            }
            media
        })
    };
    let Some(video) = asset(AssetSlot::Video) else {
        bail!("request has no video");
    };
    let dialogue = asset(AssetSlot::Dialogue);
    let music = asset(AssetSlot::Music);
    let overlay_image = asset(AssetSlot::OverlayImage);

    let inputs = RenderInputs {
        video: &video,
        dialogue: dialogue.as_ref(),
        music: music.as_ref(),
        overlay_image: overlay_image.as_ref(),
        captions: &request.captions,
        mix_policy: request
            .mix_policy
            .unwrap_or(settings.audio.mix_duration_policy),
        overlay_placement: request
            .overlay_placement
            .unwrap_or(settings.overlay.placement),
    };

    let mut variants = request
        .variants
        .clone()
        .unwrap_or_else(|| settings.jobs.default_variants.clone());
    variants.sort();
    variants.dedup();

    let composer = GraphComposer::from_settings(settings);
    let encode = EncodeOptions::from(&settings.engine);
    for variant in variants {
        let composed = composer.compose(variant, &inputs)?;
        let output = PathBuf::from(format!("{}.mp4", variant.file_stem()));
        let command = EngineCommand::from_composed(&composed, output, &encode);
        println!("# {}", variant);
        println!("{}", command.display_line(&settings.engine.ffmpeg_path));
    }
    Ok(())
}
