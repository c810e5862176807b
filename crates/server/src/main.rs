//! Vibe Server
//!
//! Axum server exposing the orchestration stream and the npm helpers, plus a
//! `run` subcommand that drives the sequencer from the terminal.

mod api;
mod app;
mod config;
mod error;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use vibe_core::config::OrchestratorConfig;
use vibe_core::swarm::{Coordinator, Mode, OrchestrationRequest, RunStatus};
use vibe_core::tools::workspace::{load_files, write_files};

use crate::app::AppState;
use crate::config::{PersistedConfig, CONFIG_PATH};

#[derive(Parser, Clone)]
#[command(author, version, about = "Vibe - multi-agent Next.js app generator")]
struct Args {
    #[command(subcommand)]
    command: Option<CliCommand>,
    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "VIBE_LOG_JSON")]
    log_json: bool,
    /// Settings file
    #[arg(long, global = true, default_value = CONFIG_PATH)]
    config: PathBuf,
    /// npm registry to resolve packages against
    #[arg(long, global = true, env = "VIBE_REGISTRY_URL")]
    registry_url: Option<String>,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// Start the HTTP server (default)
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: IpAddr,
        /// Port to listen on
        #[arg(short, long, default_value = "8080", env = "PORT")]
        port: u16,
    },
    /// Run one orchestration in-process and print its events as NDJSON
    Run {
        /// What to build or fix
        #[arg(short, long)]
        prompt: String,
        #[arg(short, long, value_enum, default_value_t = RunMode::Generate)]
        mode: RunMode,
        /// Seed the run with the files of this directory
        #[arg(long)]
        files: Option<PathBuf>,
        /// Write the final file set here
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RunMode {
    Generate,
    Correct,
    Manager,
}

impl From<RunMode> for Mode {
    fn from(mode: RunMode) -> Self {
        match mode {
            RunMode::Generate => Mode::Generate,
            RunMode::Correct => Mode::Correct,
            RunMode::Manager => Mode::Manager,
        }
    }
}

/// Logs go to stderr so `run` can keep stdout for events.
fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .ok();
    }
}

async fn run_once(
    config: OrchestratorConfig,
    prompt: String,
    mode: RunMode,
    files: Option<PathBuf>,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut request = OrchestrationRequest::new(prompt).with_mode(mode.into());
    if let Some(dir) = &files {
        request.current_files = load_files(dir)
            .with_context(|| format!("Failed to load files from {}", dir.display()))?;
        tracing::info!(files = request.current_files.len(), dir = %dir.display(), "Seeded current files");
    }

    let token = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel(64);
    let mut coordinator = Coordinator::from_config(Arc::new(config))
        .context("LLM is not configured")?
        .with_event_channel(tx)
        .with_cancellation(token.clone());

    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling run");
            interrupt.cancel();
        }
    });

    let printer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(event) = rx.recv().await {
            stdout.write_all(event.to_ndjson()?.as_bytes()).await?;
            stdout.flush().await?;
        }
        anyhow::Ok(())
    });

    let outcome = coordinator.run(request).await;
    drop(coordinator);
    printer.await.context("Event printer panicked")??;

    if let Some(dir) = &out {
        let written = write_files(dir, &outcome.files)
            .await
            .with_context(|| format!("Failed to write files to {}", dir.display()))?;
        tracing::info!(written, dir = %dir.display(), "Wrote file set");
    }

    match outcome.status {
        RunStatus::Aborted => anyhow::bail!("Run aborted after {} stages", outcome.stages_started),
        RunStatus::Cancelled => anyhow::bail!("Run cancelled"),
        status => {
            tracing::info!(?status, files = outcome.files.len(), "Run finished");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.log_json);

    let mut settings = PersistedConfig::load(&args.config).await;
    settings.merge(PersistedConfig {
        registry_url: args.registry_url.clone(),
        ..PersistedConfig::default()
    });
    let config = settings.into_orchestrator_config();

    match args.command {
        Some(CliCommand::Run {
            prompt,
            mode,
            files,
            out,
        }) => run_once(config, prompt, mode, files, out).await,
        Some(CliCommand::Serve { host, port }) => {
            app::serve(Arc::new(AppState::new(config)?), SocketAddr::new(host, port)).await
        }
        None => {
            let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080);
            app::serve(Arc::new(AppState::new(config)?), addr).await
        }
    }
}
