//! Catalog watch CLI
//!
//! Runs one crawl batch per invocation; schedule it on a timer.

use std::path::PathBuf;
use std::process::ExitCode;

use catalog_watch::{
    clock::SystemClock,
    error::Result,
    models::Config,
    pipeline,
    services::SteamCatalog,
    storage::{LocalStorage, StateStore},
};
use clap::{Parser, Subcommand};

/// catalog-watch - store catalog change feeds
#[derive(Parser, Debug)]
#[command(
    name = "catalog-watch",
    version,
    about = "Publishes catalog language and release-date changes as RSS"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "watch.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl one batch and rewrite both feeds
    Run {
        /// State snapshot path
        #[arg(long)]
        state: Option<PathBuf>,

        /// Items attempted in this run
        #[arg(long)]
        batch_size: Option<usize>,

        /// Entries kept in each feed document
        #[arg(long)]
        max_entries: Option<usize>,

        /// Delay between lookups in milliseconds
        #[arg(long)]
        sleep_ms: Option<u64>,

        /// Directory the feed documents are written to
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Validate the configuration file
    Validate,

    /// Show what the current snapshot holds
    Info {
        /// State snapshot path
        #[arg(long)]
        state: Option<PathBuf>,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let mut config = Config::load_or_default(&cli.config);
    log::debug!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Run {
            state,
            batch_size,
            max_entries,
            sleep_ms,
            output_dir,
        } => {
            if let Some(path) = state {
                config.storage.state_path = path;
            }
            if let Some(n) = batch_size {
                config.crawler.batch_size = n;
            }
            if let Some(n) = max_entries {
                config.feeds.max_items = n;
            }
            if let Some(ms) = sleep_ms {
                config.crawler.request_delay_ms = ms;
            }
            if let Some(dir) = output_dir {
                config.feeds.output_dir = dir;
            }
            config.validate()?;

            let catalog = SteamCatalog::new(config.catalog.clone())?;
            let store = LocalStorage::new(&config.storage.state_path);
            let summary = pipeline::run_watch(&config, &catalog, &store, &SystemClock).await?;

            println!("{}", summary.line());
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            config.validate()?;
            log::info!("✓ Config OK");
        }

        Command::Info { state } => {
            let path = state.unwrap_or_else(|| config.storage.state_path.clone());
            let snapshot = LocalStorage::new(&path).load().await?;

            log::info!("State file: {}", path.display());
            log::info!("Universe: {} items", snapshot.universe.len());
            match snapshot.universe_fetched_at {
                Some(at) => log::info!("Listing fetched: {}", at.to_rfc3339()),
                None => log::info!("Listing fetched: never"),
            }
            log::info!("Cursor: {}", snapshot.cursor);
            log::info!("Known items: {}", snapshot.facts.len());
            log::info!(
                "Entries: {} language added, {} release changed",
                snapshot.language_entries.len(),
                snapshot.release_entries.len()
            );
        }
    }

    Ok(())
}
