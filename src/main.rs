#![forbid(unsafe_code)]

//! `video-recorder` — records one resource end to end.
//!
//! Loads configuration and credentials, spawns the session helper, and
//! records the remaining chunks of the selected resource. SIGINT/SIGTERM
//! close the in-flight chunk and stop the run at a clean chunk boundary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use video_recorder::artifact::FileArtifactStore;
use video_recorder::config::GlobalConfig;
use video_recorder::driver::command::CommandCapture;
use video_recorder::driver::helper::{HelperConfig, HelperSession};
use video_recorder::notify::HttpNotifier;
use video_recorder::orchestrator::{run_resource, RunContext};
use video_recorder::persistence::open_store;
use video_recorder::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "video-recorder",
    about = "Resumable chunked session recorder",
    version,
    long_about = None
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Resource slug to record; overrides `resource` in the config file.
    #[arg(long)]
    resource: Option<String>,

    /// Override the maximum number of sub-tasks per chunk.
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("video-recorder bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
        .inspect_err(|err| error!(%err, "recording failed"))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    if let Some(chunk_size) = args.chunk_size {
        config.set_chunk_size(chunk_size)?;
    }
    let resource = config.select_resource(args.resource.as_deref())?.clone();
    config.load_credentials().await?;
    let config = Arc::new(config);
    info!(
        resource = resource.slug,
        chunk_size = config.recorder.chunk_size,
        "configuration loaded"
    );

    // ── Collaborators ───────────────────────────────────
    let store = open_store(&config).await?;
    let session = HelperSession::spawn(&HelperConfig {
        program: config.session.helper_cli.clone(),
        args: config.session.helper_cli_args.clone(),
        startup_timeout: Duration::from_secs(config.session.startup_timeout_seconds),
        request_timeout: Duration::from_secs(config.session.request_timeout_seconds),
        login_url: config.session.login_url.clone(),
    })
    .await?;
    let capture = CommandCapture::new(&config.capture);
    let artifacts = FileArtifactStore::new(config.video_dir_path.clone());
    let notifier = HttpNotifier::new(&config.server, config.http_timeout())?;

    let ct = CancellationToken::new();
    let ctx = RunContext::new(
        Arc::clone(&config),
        Arc::new(session),
        Arc::new(capture),
        store,
        Arc::new(artifacts),
        Arc::new(notifier),
    )
    .with_cancel(ct.clone());

    // ── Wire shutdown signal ────────────────────────────
    let signal_ct = ct.clone();
    let signal_handle = tokio::spawn(async move {
        tokio::select! {
            () = shutdown_signal() => {
                warn!("shutdown signal received, closing current chunk");
                signal_ct.cancel();
            }
            () = signal_ct.cancelled() => {}
        }
    });

    // ── Record ──────────────────────────────────────────
    let result = run_resource(&ctx, &resource).await;
    ct.cancel();
    let _ = signal_handle.await;

    let summary = result?;
    info!(
        run_id = summary.run_id,
        resumed_from = summary.resumed_from,
        chunks = summary.chunks.len(),
        announced = summary.announced,
        "video-recorder finished"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
