//! CLI entrypoint for tokiame
//!
//! This is the main binary that wires together all layers using dependency
//! injection: the model registry feeds the catalog port, the gRPC link and
//! the OpenAI backend plug into the supervisor, and process signals cancel
//! the client token for a graceful shutdown.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tokiame_application::{AgentConfig, ModelCatalog, Supervisor};
use tokiame_infrastructure::{FileModelRegistry, GrpcCoordinatorLink, OpenAiBackend, admin};

/// Tokiame — connects local inference backends to a Tokilake coordinator.
#[derive(Parser, Debug)]
#[command(name = "tokiame", version, about)]
struct Cli {
    /// The client's namespace (required).
    #[arg(long)]
    namespace: String,

    /// The remote address of Tokilake, e.g. grpc://host:50051 or
    /// grpcs://host:443 (required).
    #[arg(long)]
    addr: String,

    /// Listen address for the admin API, e.g. 127.0.0.1:8081.
    #[arg(long)]
    api_addr: Option<String>,

    /// Path to the model registry file.
    #[arg(long, default_value = "models.toml")]
    models: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory for log files (default: platform data dir).
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Disable the log file, console output only.
    #[arg(long)]
    no_log_file: bool,
}

/// Format timestamps using local time (via chrono).
struct LocalTimer;

impl tracing_subscriber::fmt::time::FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

/// Resolve the log directory path.
///
/// Priority: CLI `--log-dir` → `dirs::data_dir()/tokiame/logs/` → `.tokiame/logs/`
fn resolve_log_dir(override_path: Option<&Path>) -> PathBuf {
    if let Some(path) = override_path {
        return path.to_path_buf();
    }
    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("tokiame").join("logs");
    }
    PathBuf::from(".tokiame").join("logs")
}

/// Initialize console logging plus an optional non-blocking file layer.
///
/// Returns the worker guard that must stay alive for file log flushing.
fn init_logging(verbose: u8, log_dir_override: Option<&Path>, no_log_file: bool) -> Option<WorkerGuard> {
    let console_filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let console_layer = fmt::layer()
        .with_timer(LocalTimer)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    if no_log_file {
        tracing_subscriber::registry().with(console_layer).init();
        return None;
    }

    let log_dir = resolve_log_dir(log_dir_override);
    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!(
            "Warning: Could not create log directory {}: {}",
            log_dir.display(),
            e
        );
        tracing_subscriber::registry().with(console_layer).init();
        return None;
    }

    let log_filename = format!(
        "tokiame-{}-{}.log",
        chrono::Local::now().format("%Y-%m-%dT%H-%M-%S"),
        std::process::id()
    );
    let file_appender = tracing_appender::rolling::never(&log_dir, &log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_filter = match verbose {
        0..=2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let file_layer = fmt::layer()
        .with_timer(LocalTimer)
        .with_ansi(false)
        .with_target(true)
        .with_writer(non_blocking)
        .with_filter(file_filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Log file: {}", log_dir.join(&log_filename).display());
    Some(guard)
}

/// Cancels the shutdown token on SIGINT or SIGTERM.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("failed to install SIGTERM handler: {e}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.verbose, cli.log_dir.as_deref(), cli.no_log_file);

    info!(
        namespace = %cli.namespace,
        addr = %cli.addr,
        "starting tokiame client"
    );

    // A missing or malformed registry is fatal at startup (non-zero exit).
    let registry = FileModelRegistry::load(&cli.models).with_context(|| {
        format!(
            "failed to load model registry from '{}'",
            cli.models.display()
        )
    })?;
    registry.watch().context("failed to watch model registry")?;

    if let Some(api_addr) = cli.api_addr.clone() {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            if let Err(e) = admin::serve(&api_addr, registry).await {
                tracing::error!("admin API server failed: {e}");
            }
        });
    }

    let config = AgentConfig::new(cli.namespace, cli.addr.clone());
    let link = Arc::new(GrpcCoordinatorLink::new(cli.addr, config.namespace.clone()));
    let backend = Arc::new(OpenAiBackend::new());
    let catalog: Arc<dyn ModelCatalog> = registry;

    let supervisor = Supervisor::new(config, link, backend, catalog);
    let shutdown = supervisor.shutdown_token();

    tokio::spawn(async move {
        wait_for_signal().await;
        info!("received shutdown signal");
        shutdown.cancel();
    });

    supervisor.run().await;

    info!("tokiame shut down gracefully");
    Ok(())
}
