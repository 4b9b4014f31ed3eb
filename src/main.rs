//! Funding reconciler.
//!
//! Watches a funding-request service and the Bazo chain and drives every
//! approved request to completion.
//!
//! ```text
//!   request service                    chain node
//!   (summary, status, update)          (account, create/send tx)
//!          │   ▲                             ▲
//!          ▼   │                             │
//!   ┌──────────────────────────────────────────────────────┐
//!   │  accounts loop ◀──── re-route ──── funds loop        │
//!   │   open → pending                fundprocessed →      │
//!   │                                   processed          │
//!   │                                                      │
//!   │  status reporter    submission journal    admin API  │
//!   └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use funding_reconciler::admin::{self, AdminState};
use funding_reconciler::config::{load_or_default, ReconcilerConfig};
use funding_reconciler::lifecycle::{build_reconciler, wait_for_termination, Shutdown};
use funding_reconciler::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "funding-reconciler", version)]
#[command(about = "Reconciles funding requests against the Bazo chain", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Issuer key file: X, Y and optionally D as hex lines.
    key_file: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_logging(&config.observability) {
        eprintln!("Error: cannot initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: ReconcilerConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "funding-reconciler starting");
    tracing::info!(
        request_service = %config.request_service.base_url,
        chain = %config.chain.base_url,
        strategy = ?config.submitter.strategy,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let reconciler = build_reconciler(&config, &cli.key_file)?;

    let admin_listener = if config.admin.enabled {
        Some(TcpListener::bind(config.admin.bind_address.as_str()).await?)
    } else {
        None
    };

    let shutdown = Shutdown::new();
    let (handle, mut tasks) = reconciler.spawn(&shutdown);
    let journal = handle.journal.clone();

    if let Some(listener) = admin_listener {
        let state = AdminState {
            reconciler: handle,
            api_key: Arc::from(config.admin.api_key.as_str()),
        };
        let admin_shutdown = shutdown.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = admin::serve(listener, state, admin_shutdown).await {
                tracing::error!(error = %e, "Admin API failed");
            }
        }));
    }

    if let Err(e) = wait_for_termination().await {
        tracing::error!(error = %e, "Cannot listen for signals, shutting down");
    }
    tracing::info!(
        subscribers = shutdown.receiver_count(),
        "Shutdown requested, waiting for running cycles"
    );
    shutdown.trigger();

    let grace = Duration::from_secs(config.reconciler.shutdown_grace_secs);
    let deadline = tokio::time::Instant::now() + grace;
    for task in tasks {
        if tokio::time::timeout_at(deadline, task).await.is_err() {
            tracing::warn!(grace_secs = grace.as_secs(), "Grace period elapsed, abandoning running cycles");
            break;
        }
    }

    if let Err(e) = journal.save_to_file() {
        tracing::error!(error = %e, "Failed to save submission journal");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
