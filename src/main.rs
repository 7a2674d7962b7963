//! Forum-Harvest main entry point
//!
//! This is the command-line interface for the Forum-Harvest post harvester.

use anyhow::Context;
use clap::Parser;
use forum_harvest::config::{load_config_with_hash, Config, RendererBackend, StoreFormat};
use forum_harvest::crawler::harvest;
use forum_harvest::output::print_summary;
use forum_harvest::prompt::read_page_count;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Forum-Harvest: a paginated forum post harvester
///
/// Walks a forum listing for post links, renders every post with a pool of
/// headless browsers and merges each post's body and comments into a store
/// that grows across runs.
#[derive(Parser, Debug)]
#[command(name = "forum-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A paginated forum post harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when absent)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Number of listing pages to walk (prompted for when absent)
    #[arg(short, long)]
    pages: Option<u32>,

    /// Number of concurrent post workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Renderer backend
    #[arg(long, value_enum)]
    backend: Option<RendererBackend>,

    /// Store path
    #[arg(long, value_name = "PATH")]
    store: Option<String>,

    /// Store format
    #[arg(long, value_enum)]
    format: Option<StoreFormat>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    apply_overrides(&mut config, &cli);
    forum_harvest::config::validate(&config).context("invalid command-line override")?;

    let pages = match config.crawler.max_pages {
        Some(pages) => pages,
        None => {
            let stdin = std::io::stdin();
            read_page_count(stdin.lock(), std::io::stdout()).context("no page count given")?
        }
    };

    tracing::info!(
        "Harvesting {} with {} workers ({:?} renderer, {:?} store at {})",
        config.site.start_url,
        config.crawler.max_workers,
        config.renderer.backend,
        config.output.format,
        config.output.store_path
    );

    match harvest(config, pages).await {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("forum_harvest=info,warn"),
            1 => EnvFilter::new("forum_harvest=debug,info"),
            2 => EnvFilter::new("forum_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Lets command-line flags win over the configuration file
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(pages) = cli.pages {
        config.crawler.max_pages = Some(pages);
    }
    if let Some(workers) = cli.workers {
        config.crawler.max_workers = workers;
    }
    if let Some(backend) = cli.backend {
        config.renderer.backend = backend;
    }
    if let Some(store) = &cli.store {
        config.output.store_path = store.clone();
    }
    if let Some(format) = cli.format {
        config.output.format = format;
    }
}
