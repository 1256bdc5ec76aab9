//! Sumi-Crawler main entry point
//!
//! This is the command-line interface for the Sumi-Crawler data crawler.

use clap::Parser;
use std::path::{Path, PathBuf};
use sumi_crawler::config::{load_config_with_hash, Config};
use sumi_crawler::crawler::run_crawl;
use sumi_crawler::output::{load_statistics, print_statistics};
use sumi_crawler::persistence::SqliteSink;
use tracing_subscriber::EnvFilter;

/// URLs printed by `--dry-run` before the listing is cut short
const DRY_RUN_LISTED_URLS: usize = 100;

/// Sumi-Crawler: a composable web data crawler
///
/// Sumi-Crawler expands a templated URL into a list of URLs, crawls them
/// with the configured role (sequential, threads, worker pool or async),
/// parses every response and stores the resulting rows in SQLite.
#[derive(Parser, Debug)]
#[command(name = "sumi-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A composable web data crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and list the URLs that would be crawled
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(&config, &config_hash)?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_crawler=info,warn"),
            1 => EnvFilter::new("sumi_crawler=debug,info"),
            2 => EnvFilter::new("sumi_crawler=trace,debug"),
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

/// Handles the --dry-run mode: validates config and lists the URLs
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Sumi-Crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Role: {}", config.crawler.role);
    println!("  Method: {}", config.crawler.method);
    println!("  Attempts per request: {}", config.crawler.retry);
    println!("  Workers: {}", config.crawler.workers);
    if config.crawler.lock {
        println!("  Save guard: lock");
    } else {
        println!("  Save guard: semaphore ({})", config.crawler.sema_value);
    }

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nParser:");
    println!("  Kind: {:?}", config.parser.kind);
    println!("  Skip header: {}", config.parser.skip_header);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Destination: {}", config.output.destination);

    let generator = config.target.generator()?;
    let mut urls = generator.iter()?;
    let listed: Vec<String> = urls.by_ref().take(DRY_RUN_LISTED_URLS).collect();
    let more = urls.next().is_some();

    println!("\nTarget URLs ({} rule):", generator.placeholder());
    for url in &listed {
        println!("  - {}", url);
    }
    if more {
        println!("  ... (only the first {} are listed)", DRY_RUN_LISTED_URLS);
    }

    println!("\n✓ Configuration is valid");
    if !more {
        println!("✓ Would crawl {} URLs", listed.len());
    }

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.output.database_path);

    let sink = SqliteSink::open(
        Path::new(&config.output.database_path),
        config.output.destination.clone(),
    )?;
    let stats = load_statistics(&sink)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
fn handle_crawl(config: &Config, config_hash: &str) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Crawling {} with the {} role into '{}'",
        config.target.url,
        config.crawler.role,
        config.output.destination
    );

    match run_crawl(config, config_hash) {
        Ok(report) if report.is_complete() => {
            tracing::info!("Crawl completed successfully ({} results saved)", report.saved);
            Ok(())
        }
        Ok(report) => {
            tracing::warn!(
                "Crawl finished with {} failed tasks out of {}",
                report.failed_tasks,
                report.tasks
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
