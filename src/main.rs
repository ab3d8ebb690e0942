//! # vectorsync CLI (`vsync`)
//!
//! ## Usage
//!
//! ```bash
//! vsync [--config <file>] [--project-root <dir>] [--pipe] [-v] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `vsync vectorise [FILES]...` | Sync files into the project's collection |
//! | `vsync ls` | List this user's collections on this host |
//! | `vsync check` | Check that the vector store is reachable |
//!
//! ## Exit codes
//!
//! `0` on success. `1` on configuration errors, store errors, or when the
//! pass is interrupted (Ctrl-C prints `Abort.`).

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use vectorsync::chroma::ChromaClient;
use vectorsync::config::{self, Config};
use vectorsync::discovery::DiscoveryRequest;
use vectorsync::error::SyncError;
use vectorsync::ls;
use vectorsync::progress::ProgressMode;
use vectorsync::stats;
use vectorsync::vectorise::{resolve_project_root, run_vectorise, VectoriseRequest};

/// vectorsync: keep a vector-store collection in step with a project's files.
#[derive(Parser)]
#[command(
    name = "vsync",
    about = "Incrementally sync project files into a vector-store collection",
    version
)]
struct Cli {
    /// Path to a configuration file (TOML).
    ///
    /// Without it, `<project_root>/.vectorsync/config.toml` and then the
    /// user config directory are tried before falling back to defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Project root. Defaults to the current directory.
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    /// Machine-readable output: JSON on stdout, no progress.
    #[arg(long, global = true)]
    pipe: bool,

    /// Debug logging on stderr (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync files into the project's collection.
    ///
    /// Each file's previous records are replaced; records of files that no
    /// longer exist are removed afterwards.
    Vectorise {
        /// Files, directories, or glob patterns.
        files: Vec<String>,

        /// Descend into directories.
        #[arg(short, long)]
        recursive: bool,

        /// Include files matched by `.gitignore`.
        #[arg(short, long)]
        force: bool,

        /// Chunk size in characters.
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Overlap between consecutive chunks, as a fraction of the chunk size.
        #[arg(long)]
        overlap: Option<f64>,

        /// Maximum number of files processed at once (0 = unbounded).
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// List collections created by this user on this host.
    Ls,

    /// Check that the vector store is reachable.
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if matches!(err.downcast_ref::<SyncError>(), Some(SyncError::Cancelled)) {
                eprintln!("Abort.");
            } else {
                eprintln!("Error: {:#}", err);
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let project_root = resolve_project_root(cli.project_root.as_deref())?;
    let (mut cfg, source) = config::resolve_config(cli.config.as_deref(), &project_root)?;
    match &source {
        Some(path) => debug!(config = %path.display(), "loaded config"),
        None => debug!("no config file found, using defaults"),
    }

    match cli.command {
        Commands::Vectorise {
            files,
            recursive,
            force,
            chunk_size,
            overlap,
            concurrency,
        } => {
            apply_overrides(&mut cfg, chunk_size, overlap, concurrency)?;

            let request = VectoriseRequest {
                base: std::env::current_dir().context("cannot read current directory")?,
                project_root,
                discovery: DiscoveryRequest {
                    specs: files,
                    recursive,
                    force,
                },
            };
            let progress = Arc::from(ProgressMode::for_cli(cli.pipe).reporter());

            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => on_signal.cancel(),
                    Err(e) => warn!(error = %e, "cannot listen for Ctrl-C"),
                }
            });

            let report = run_vectorise(&cfg, &request, progress, &cancel).await?;
            stats::print_report(&report, cli.pipe)?;
        }
        Commands::Ls => {
            let client = ChromaClient::new(&cfg.db)?;
            ls::run_ls(&client, cli.pipe).await?;
        }
        Commands::Check => {
            let client = ChromaClient::new(&cfg.db)?;
            client
                .heartbeat()
                .await
                .with_context(|| format!("vector store at {} is unreachable", client.base_url()))?;
            if !cli.pipe {
                println!("ok: {}", client.base_url());
            }
        }
    }

    Ok(())
}

/// Apply CLI flags on top of the loaded config and re-validate.
fn apply_overrides(
    cfg: &mut Config,
    chunk_size: Option<usize>,
    overlap: Option<f64>,
    concurrency: Option<usize>,
) -> Result<()> {
    if let Some(size) = chunk_size {
        cfg.chunking.chunk_size = size;
    }
    if let Some(ratio) = overlap {
        cfg.chunking.overlap_ratio = ratio;
    }
    if let Some(n) = concurrency {
        cfg.sync.concurrency = n;
    }
    cfg.validate()
}
