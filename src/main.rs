//! # Workspace Indexer CLI (`widx`)
//!
//! The `widx` binary hosts the indexing core: bulk runs, live watching,
//! nearest-match queries, and ad hoc single-file resync.
//!
//! ## Usage
//!
//! ```bash
//! widx --config ./widx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `widx index [ROOT]` | Bulk pass over the workspace; `--watch` stays resident |
//! | `widx query "<text>"` | Nearest-match query against the searchable store |
//! | `widx sync <path>` | Re-run the pipeline for a single file |
//!
//! ## Examples
//!
//! ```bash
//! # One-off bulk pass, no config file needed
//! widx index ~/projects/app
//!
//! # Bulk pass, then keep the index fresh as files change
//! widx index --config ./widx.toml --watch
//!
//! # Query the store
//! widx query "connection pool retry" --limit 3
//!
//! # Resync one file after an external edit
//! widx sync src/server.py
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use workspace_indexer::config::{self, Config};
use workspace_indexer::indexer::IndexService;
use workspace_indexer::progress::ProgressMode;

/// Workspace Indexer CLI — incremental indexing of a source-code workspace
/// for retrieval-augmented querying.
#[derive(Parser)]
#[command(
    name = "widx",
    about = "Workspace Indexer — incremental workspace indexing for retrieval-augmented querying",
    version,
    long_about = "Workspace Indexer discovers eligible files under a workspace root, detects \
    changes via a persisted fingerprint cache, splits changed files into bounded-size chunks, \
    and pushes them into a searchable store. A live filesystem watcher keeps the index \
    current between bulk runs."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./widx.toml`. For `index` with an explicit ROOT the file
    /// may be absent; every other setting then takes its default.
    #[arg(long, global = true, default_value = "./widx.toml")]
    config: PathBuf,

    /// Progress output on stderr. Defaults to `human` when stderr is a TTY,
    /// otherwise `off`.
    #[arg(long, global = true)]
    progress: Option<ProgressArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum ProgressArg {
    Human,
    Json,
    Off,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Run a bulk pass over the workspace.
    ///
    /// Scans the root, indexes changed files across the worker pool, and
    /// persists the fingerprint cache. With `--watch`, stays resident after
    /// the pass and re-indexes files as they change until interrupted.
    Index {
        /// Workspace root; overrides `workspace.root` from the config file.
        root: Option<PathBuf>,

        /// Stay resident after the bulk pass and re-index live edits.
        #[arg(long)]
        watch: bool,
    },

    /// Query the searchable store.
    ///
    /// Returns stored chunks ranked by relevance, with their source path
    /// and chunk index.
    Query {
        /// The query text.
        text: String,

        /// Maximum number of results (defaults to `store.top_n`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Re-index a single file outside the bulk pool.
    Sync {
        /// File to re-index.
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mode = match cli.progress {
        Some(ProgressArg::Human) => ProgressMode::Human,
        Some(ProgressArg::Json) => ProgressMode::Json,
        Some(ProgressArg::Off) => ProgressMode::Off,
        None => ProgressMode::default_for_tty(),
    };

    match cli.command {
        Commands::Index { root, watch } => {
            let cfg = load_or_default(&cli.config, root)?;
            let mut service = IndexService::new(&cfg)?;
            let reporter = mode.reporter();

            let stats = service.run_bulk(reporter.as_ref()).await;
            println!("index {}", service.root().display());
            println!("  files discovered: {}", stats.total);
            println!("  indexed: {}", stats.indexed);
            println!("  skipped: {}", stats.skipped);
            println!("  errors: {}", stats.errors);
            println!("ok");

            if watch {
                service.arm_watcher()?;
                eprintln!("watching {} (ctrl-c to stop)", service.root().display());
                tokio::signal::ctrl_c().await?;
                service.stop().await;
            }
        }
        Commands::Query { text, limit } => {
            let cfg = config::load_config(&cli.config)?;
            let top_n = limit.unwrap_or(cfg.store.top_n);
            let service = IndexService::new(&cfg)?;

            let results = service.query(&text, top_n).await?;
            if results.is_empty() {
                println!("No results.");
                return Ok(());
            }
            for (i, doc) in results.iter().enumerate() {
                println!(
                    "{}. [{:.2}] {} #{}",
                    i + 1,
                    doc.score,
                    doc.metadata.path,
                    doc.metadata.chunk_index
                );
                println!("    excerpt: \"{}\"", excerpt(&doc.text));
                println!("    id: {}", doc.id);
                println!();
            }
        }
        Commands::Sync { path } => {
            let cfg = config::load_config(&cli.config)?;
            let service = IndexService::new(&cfg)?;

            // Keep cache keys canonical so an ad hoc sync and a bulk run
            // agree on the same entry.
            let path = path.canonicalize().unwrap_or(path);
            let outcome = service.process_single(&path).await;
            if let Err(err) = service.cache().persist() {
                tracing::warn!("{err}");
            }
            println!("sync {}", path.display());
            println!("  status: {}", outcome.status);
            println!("ok");
        }
    }

    Ok(())
}

/// Load the config file, or fall back to defaults when `widx index ROOT` is
/// used without one.
fn load_or_default(config_path: &Path, root: Option<PathBuf>) -> Result<Config> {
    if config_path.exists() {
        let mut cfg = config::load_config(config_path)?;
        if let Some(root) = root {
            cfg.workspace.root = root;
        }
        Ok(cfg)
    } else if let Some(root) = root {
        Ok(Config::for_root(root))
    } else {
        anyhow::bail!(
            "Config file {} not found; pass a workspace root or --config",
            config_path.display()
        )
    }
}

fn excerpt(text: &str) -> String {
    let flat = text.replace('\n', " ");
    let trimmed = flat.trim();
    let cut: String = trimmed.chars().take(160).collect();
    if cut.len() < trimmed.len() {
        format!("{}…", cut)
    } else {
        cut
    }
}
