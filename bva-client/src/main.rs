//! Banknote voice assistant (bva) - command-line front end
//!
//! Plays the presentation-layer role in a terminal: runs one recognition
//! session for a file on disk and renders the normalized result, or probes
//! service health.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use bva_client::media::upload::{self, DropOrigin};
use bva_client::playback::HeadlessElement;
use bva_client::results::{self, ResultView};
use bva_client::{AcquisitionError, AppContext, SessionState};
use bva_common::api::PredictionResult;
use bva_common::config::ConfigOverrides;
use bva_common::ClientConfig;
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for bva
#[derive(Parser, Debug)]
#[command(name = "bva")]
#[command(about = "Banknote recognition with spoken feedback")]
#[command(version)]
struct Args {
    /// Recognition service base URL
    #[arg(long)]
    api_url: Option<String>,

    /// Static bearer credential
    #[arg(long)]
    api_key: Option<String>,

    /// Config file (default: <config_dir>/bva/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not start audio feedback automatically
    #[arg(long)]
    no_autoplay: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe recognition service availability
    Health,

    /// Recognize the banknotes in an image file
    Predict {
        /// Image file to submit
        file: PathBuf,

        /// Write inline audio (when the service sends it) to this path
        #[arg(long)]
        audio_out: Option<PathBuf>,
    },
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_path: self.config.clone(),
            api_url: self.api_url.clone(),
            api_key: self.api_key.clone(),
            autoplay: self.no_autoplay.then_some(false),
            ..ConfigOverrides::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bva_client=info,bva=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config =
        ClientConfig::resolve(&args.overrides()).context("Failed to resolve configuration")?;
    info!(api_url = %config.api_url, "Configuration resolved");

    match args.command {
        Command::Health => run_health(config).await,
        Command::Predict { file, audio_out } => {
            tokio::select! {
                code = run_predict(config, &file, audio_out.as_deref()) => code,
                _ = shutdown_signal() => Ok(ExitCode::from(130)),
            }
        }
    }
}

async fn run_health(config: ClientConfig) -> Result<ExitCode> {
    let (element, _media) = HeadlessElement::new();
    let ctx = AppContext::new(config, Box::new(element)).context("Failed to build HTTP client")?;

    let status = ctx.health.probe().await;
    println!("{}", status);

    Ok(if status.is_up() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run_predict(
    config: ClientConfig,
    file: &Path,
    audio_out: Option<&Path>,
) -> Result<ExitCode> {
    let (element, mut media) = HeadlessElement::new();
    let ctx = AppContext::new(config, Box::new(element)).context("Failed to build HTTP client")?;
    let session = &ctx.session;

    // Acquisition: validation failures stop here, before any network call
    session.begin_acquisition();
    let candidate = match acquire(file).await {
        Ok(Some(candidate)) => candidate,
        Ok(None) => {
            session.abandon_acquisition();
            eprintln!("No file selected");
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => {
            session.abandon_acquisition();
            eprintln!("{}: {}", e.kind(), e);
            return Ok(ExitCode::FAILURE);
        }
    };

    // Health runs beside the session; submission never waits on it
    let cancel = CancellationToken::new();
    let health_task = ctx.start_health(cancel.clone());
    let resolution = session.submit(candidate).await;
    tracing::debug!(?resolution, health = %ctx.health.status(), "Submission finished");

    // Drain media element events into the audio controller
    while let Ok(event) = media.try_recv() {
        session.handle_media_event(event);
    }

    let code = match session.state() {
        SessionState::Success(result) => {
            render(&results::normalize(&result));
            render_audio(&ctx, &result, audio_out).await?;
            ExitCode::SUCCESS
        }
        SessionState::Failed(info) => {
            eprintln!("{}", info);
            ExitCode::FAILURE
        }
        other => {
            // Submitting is never terminal; anything else is a bug
            anyhow::bail!("Session ended in unexpected state {:?}", other.phase());
        }
    };

    cancel.cancel();
    let _ = health_task.await;
    Ok(code)
}

async fn acquire(
    file: &Path,
) -> std::result::Result<Option<bva_client::media::CandidateImage>, AcquisitionError> {
    let selected = upload::read_file(file).await?;
    upload::accept_selection(vec![selected], DropOrigin::Picker)
}

fn render(view: &ResultView) {
    match view {
        ResultView::NoDetections { text } => {
            if !text.is_empty() {
                println!("{}", text);
            }
            println!("No banknotes detected");
        }
        ResultView::Detected {
            text,
            entries,
            summary,
            total_label,
            ..
        } => {
            println!("{}", text);
            println!("{}", summary);
            for entry in entries {
                println!(
                    "  {:<8} {:>7}  {:<7} {}",
                    entry.label, entry.confidence, entry.style.as_str(), entry.bbox
                );
            }
            println!("Total: {}", total_label);
        }
    }
}

async fn render_audio(
    ctx: &AppContext,
    result: &PredictionResult,
    audio_out: Option<&Path>,
) -> Result<()> {
    let audio = ctx.session.audio_snapshot();
    if let Some(url) = &audio.source_url {
        let status = if audio.is_loading { "loading" } else { "ready" };
        println!("Audio: {} ({})", url, status);
    }

    let Some(path) = audio_out else {
        return Ok(());
    };
    match result.decode_inline_audio() {
        Some(Ok(bytes)) => {
            tokio::fs::write(path, &bytes)
                .await
                .with_context(|| format!("Failed to write audio to {}", path.display()))?;
            info!(path = %path.display(), bytes = bytes.len(), "Inline audio written");
        }
        Some(Err(e)) => tracing::warn!(error = %e, "Inline audio is not valid base64"),
        None => tracing::warn!("Service did not include inline audio"),
    }
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, abandoning session");
        },
        _ = terminate => {
            info!("Received terminate signal, abandoning session");
        },
    }
}
