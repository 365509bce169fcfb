//! bgm-client - BGM Creator command-line front end
//!
//! Submits an audio file (plus optional background image) to the media
//! processing service, shows upload and processing progress, and downloads
//! the rendered video once the job completes.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use bgm_client::render::{failure_line, render_line};
use bgm_client::{ArtifactRef, FormState, HttpBackend, PollConfig, UiState, UploadSession};
use bgm_common::api::artifact_file_name;
use bgm_common::config::{
    default_config_path, read_toml_config, resolve_backend_url, ConfigSource, TomlConfig,
};
use clap::Parser;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for bgm-client
#[derive(Parser, Debug)]
#[command(name = "bgm-client")]
#[command(about = "Create a long-form BGM video from an audio loop")]
#[command(version)]
struct Args {
    /// Audio file to loop (MP3, WAV)
    audio: PathBuf,

    /// Background image for the video
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Video duration in minutes (1-30)
    #[arg(short, long, default_value = "10")]
    duration: String,

    /// Speed adjustment: 0.75, 0.9, 1.1 or 1.25 (omit for none)
    #[arg(long)]
    frequency: Option<String>,

    /// Fade in length in seconds (0-10)
    #[arg(long, default_value = "2")]
    fade_in: String,

    /// Fade out length in seconds (0-10)
    #[arg(long, default_value = "2")]
    fade_out: String,

    /// Add a slow motion effect to the image
    #[arg(long)]
    motion: bool,

    /// Audio profile: default, work, relax or focus
    #[arg(long, default_value = "default")]
    profile: String,

    /// Apply frequency optimization for the selected profile
    #[arg(long)]
    optimize_frequency: bool,

    /// Base address of the processing service
    #[arg(long)]
    backend_url: Option<String>,

    /// Configuration file (default: <config dir>/bgm-creator/config.toml)
    #[arg(short, long, env = "BGM_CONFIG")]
    config: Option<PathBuf>,

    /// Where to save the video (default: ./bgm_<file id>.mp4)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the download address instead of downloading
    #[arg(long)]
    no_download: bool,

    /// Interval between status checks in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Stop waiting for the job after this many seconds
    #[arg(long)]
    max_wait_secs: Option<u64>,

    /// Stop after this many failed status checks in a row
    #[arg(long)]
    max_poll_failures: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(default_config_path);
    let (toml_config, config_source) = match &config_path {
        Some(path) => read_toml_config(path)?,
        None => (TomlConfig::default(), ConfigSource::Builtin),
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting bgm-client v{}", env!("CARGO_PKG_VERSION"));
    config_source.log();

    let backend_url = resolve_backend_url(args.backend_url.as_deref(), &toml_config)?;
    let backend = Arc::new(HttpBackend::new(&backend_url)?);

    match backend.health().await {
        Ok(health) => info!("Processing service: {}", health.message),
        Err(e) => warn!("Processing service health check failed ({}); submitting anyway", e),
    }

    let mut session = UploadSession::new(backend.clone(), poll_config(&args, &toml_config));
    apply_form_args(session.form_mut(), &args);

    let renderer = tokio::spawn(render_states(session.subscribe()));

    let outcome = tokio::select! {
        result = run_job(&mut session) => Some(result),
        _ = signal::ctrl_c() => None,
    };

    let artifact = match outcome {
        None => {
            warn!("Interrupted - cancelling");
            session.teardown();
            renderer.abort();
            return Ok(ExitCode::from(130));
        }
        Some(Err(e)) => {
            match failure_line(&session.state(), &e.to_string()) {
                // The renderer prints the failed state itself
                None => {
                    let _ = renderer.await;
                }
                Some(line) => {
                    renderer.abort();
                    eprintln!("{}", line);
                }
            }
            return Ok(ExitCode::FAILURE);
        }
        Some(Ok(artifact)) => {
            let _ = renderer.await;
            artifact
        }
    };

    if args.no_download {
        println!("{}", artifact.download_url);
        return Ok(ExitCode::SUCCESS);
    }

    let dest = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(artifact_file_name(&artifact.file_id)));
    let bytes = backend
        .download_artifact(&artifact, &dest)
        .await
        .with_context(|| format!("Failed to download {}", artifact.download_url))?;

    println!("Saved {} ({} bytes)", dest.display(), bytes);
    Ok(ExitCode::SUCCESS)
}

/// Submit and wait for a terminal state
async fn run_job(session: &mut UploadSession) -> Result<ArtifactRef> {
    let mut rx = session.subscribe();
    session
        .submit()
        .await
        .map_err(|e| anyhow!(e.user_message()))?;

    let state = rx
        .wait_for(UiState::is_terminal)
        .await
        .context("UI state channel closed")?
        .clone();

    match state {
        UiState::Completed { artifact } => Ok(artifact),
        UiState::Failed { message } => bail!(message),
        other => bail!("unexpected final state {:?}", other),
    }
}

/// Print a line per visible state change until a terminal state
async fn render_states(mut rx: watch::Receiver<UiState>) {
    let mut last_line = String::new();
    loop {
        let state = rx.borrow_and_update().clone();
        if state != UiState::Idle {
            let line = render_line(&state);
            if line != last_line {
                println!("{}", line);
                last_line = line;
            }
        }
        if state.is_terminal() || rx.changed().await.is_err() {
            break;
        }
    }
}

fn poll_config(args: &Args, toml_config: &TomlConfig) -> PollConfig {
    let mut config = PollConfig::from(&toml_config.polling);
    if let Some(ms) = args.poll_interval_ms {
        config.interval = Duration::from_millis(ms.max(1));
    }
    if let Some(secs) = args.max_wait_secs {
        config.max_wait = Some(Duration::from_secs(secs));
    }
    if let Some(max) = args.max_poll_failures {
        config.max_consecutive_failures = Some(max);
    }
    config
}

/// Feed command-line values through the form mutators; rejected values keep the defaults
fn apply_form_args(form: &mut FormState, args: &Args) {
    if !form.select_audio_file(&args.audio) {
        warn!("Ignoring empty audio path");
    }
    if let Some(image) = &args.image {
        if !form.select_image_file(image) {
            warn!("Ignoring empty image path");
        }
    }
    if !form.set_duration_minutes(&args.duration) {
        warn!(
            "Ignoring --duration {:?}; keeping {} minutes",
            args.duration,
            form.duration_seconds() / 60
        );
    }
    if let Some(frequency) = &args.frequency {
        if !form.set_frequency(frequency) {
            warn!("Ignoring --frequency {:?}; no adjustment applied", frequency);
        }
    }
    if !form.set_fade_in(&args.fade_in) {
        warn!(
            "Ignoring --fade-in {:?}; keeping {}s",
            args.fade_in,
            form.fade_in_seconds()
        );
    }
    if !form.set_fade_out(&args.fade_out) {
        warn!(
            "Ignoring --fade-out {:?}; keeping {}s",
            args.fade_out,
            form.fade_out_seconds()
        );
    }
    if !form.set_audio_profile(&args.profile) {
        warn!(
            "Ignoring --profile {:?}; keeping {}",
            args.profile,
            form.audio_profile().as_str()
        );
    }
    form.set_motion_enabled(args.motion);
    form.set_frequency_optimization_enabled(args.optimize_frequency);
}
