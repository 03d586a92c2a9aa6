//! Reel-Census main entry point
//!
//! This is the command-line interface for the film diary census.

use anyhow::{bail, Context};
use clap::Parser;
use reel_census::config::{load_config_with_hash, validate_concurrency, validate_user, Config, TopN};
use reel_census::crawler::listing_url;
use reel_census::output::{print_report, write_markdown_report, CsvSummaryStore, SummaryStore};
use reel_census::{Coordinator, RunRequest, RunSummary};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Reel-Census: counts what an account has watched
///
/// Walks the public film listing of one account, reads every film page and
/// reports the languages, countries, genres, directors, actors and decades
/// it found, along with the total running time.
#[derive(Parser, Debug)]
#[command(name = "reel-census")]
#[command(version = "1.0.0")]
#[command(about = "Film diary census", long_about = None)]
struct Cli {
    /// Account whose films are counted
    #[arg(value_name = "USER", required_unless_present = "load")]
    user: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Number of film pages fetched concurrently
    #[arg(short = 'j', long, value_name = "N")]
    concurrency: Option<usize>,

    /// Rows per ranked table: a positive number or "unlimited"
    #[arg(long, value_name = "N")]
    top: Option<TopN>,

    /// Save the summary as CSV
    #[arg(short, long, value_name = "CSV")]
    output: Option<PathBuf>,

    /// Write a markdown report
    #[arg(long, value_name = "MD")]
    summary: Option<PathBuf>,

    /// Show a previously saved CSV summary instead of crawling
    #[arg(long, value_name = "CSV", conflicts_with = "dry_run")]
    load: Option<PathBuf>,

    /// Validate settings and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,

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

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if let Some(top) = cli.top {
        config.display.top_n = top;
    }

    if let Some(path) = &cli.load {
        return handle_load(&config, path, cli.summary.as_deref());
    }

    let Some(user) = cli.user.clone() else {
        bail!("an account name is required");
    };
    validate_user(&user)?;
    let concurrency = cli
        .concurrency
        .unwrap_or(config.crawler.max_concurrent_fetches);
    validate_concurrency(concurrency)?;

    if cli.dry_run {
        handle_dry_run(&config, &user, concurrency);
        return Ok(());
    }

    handle_census(config, user, concurrency, &cli).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("reel_census=info,warn"),
            1 => EnvFilter::new("reel_census=debug,info"),
            2 => EnvFilter::new("reel_census=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles --dry-run: shows the effective settings and the first listing URL
fn handle_dry_run(config: &Config, user: &str, concurrency: usize) {
    println!("=== Reel-Census Dry Run ===\n");

    println!("Account: {}", user);
    println!(
        "First listing page: {}",
        listing_url(&config.site.base_url, user, 1)
    );

    println!("\nCrawler:");
    println!("  Concurrent fetches: {}", concurrency);
    println!("  Max listing pages: {}", config.crawler.max_listing_pages);
    println!("  Films per listing page: {}", config.site.items_per_page);
    println!("  Merge batch size: {}", config.crawler.merge_batch_size);

    println!("\nHTTP:");
    println!("  Request timeout: {}ms", config.http.request_timeout_ms);
    println!("  Connect timeout: {}ms", config.http.connect_timeout_ms);
    println!("  Attempts per page: {}", config.http.max_attempts);
    println!("  Backoff base: {}ms", config.http.backoff_base_ms);
    println!("  User agent: {}", config.user_agent.header_value());

    println!("\nDisplay:");
    println!("  Top N: {}", config.display.top_n);

    println!("\n✓ Configuration is valid");
}

/// Handles --load: reports on a saved summary
fn handle_load(config: &Config, path: &Path, markdown: Option<&Path>) -> anyhow::Result<()> {
    let store = CsvSummaryStore::new(path);
    let summary = store
        .load()
        .with_context(|| format!("Failed to load summary {}", path.display()))?;

    present(config, &summary, markdown)
}

/// Runs a census, wiring Ctrl-C to cancellation
async fn handle_census(
    config: Config,
    user: String,
    concurrency: usize,
    cli: &Cli,
) -> anyhow::Result<()> {
    let display = config.clone();
    let mut coordinator = Coordinator::new(config)?;

    let token = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing with partial results");
            token.cancel();
        }
    });

    let request = RunRequest::new(user).with_concurrency(concurrency);
    let summary = match coordinator.run(request).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("Census failed: {}", e);
            return Err(e.into());
        }
    };

    if let Some(path) = &cli.output {
        CsvSummaryStore::new(path)
            .save(&summary)
            .with_context(|| format!("Failed to save summary {}", path.display()))?;
    }

    present(&display, &summary, cli.summary.as_deref())
}

fn present(config: &Config, summary: &RunSummary, markdown: Option<&Path>) -> anyhow::Result<()> {
    print_report(summary, config.display.top_n);

    if let Some(path) = markdown {
        write_markdown_report(summary, config.display.top_n, path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        println!("\n✓ Report written to: {}", path.display());
    }

    Ok(())
}
