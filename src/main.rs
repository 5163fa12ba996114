//! Crawl-Ledger main entry point
//!
//! This is the command-line interface for the two-phase site cataloguer.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use crawl_ledger::config::{load_config_with_hash, Config};
use crawl_ledger::crawler::{discover, scrape};
use crawl_ledger::ledger::{CurationPolicy, Ledger, LedgerStore, LinkStatus};
use crawl_ledger::output::{ledger_statistics, print_statistics, write_review_sheet};
use crawl_ledger::url::{resolve_site_id, CanonicalUrl};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Crawl-Ledger: discover a site's links, curate them, then scrape the keepers
///
/// `discover` crawls from a seed URL and merges every in-scope link into the
/// site's ledger as `pending`. A curator marks entries `keep` or `skip`
/// (by hand with `mark`, or by rule with `curate`), and `scrape` retrieves
/// content only for the approved entries.
#[derive(Parser, Debug)]
#[command(name = "crawl-ledger")]
#[command(version)]
#[command(about = "Discover, curate and scrape one site at a time", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl from a seed URL and merge findings into the site's ledger
    Discover {
        /// Absolute http(s) URL to start from
        seed: String,
    },

    /// Retrieve content for approved ledger entries
    Scrape {
        /// Site identifier, or any URL on the site
        site: String,

        /// Statuses to retrieve (repeatable)
        #[arg(long = "status", default_value = "keep")]
        statuses: Vec<LinkStatus>,
    },

    /// Set the curation status of one ledger entry
    Mark {
        /// Site identifier, or any URL on the site
        site: String,

        /// URL of the entry (canonicalized before lookup)
        url: String,

        /// pending, keep or skip
        status: LinkStatus,

        /// Replace the entry's notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// Apply the [curation] keep/skip rules to pending entries
    Curate {
        /// Site identifier, or any URL on the site
        site: String,
    },

    /// Show ledger statistics
    Stats {
        /// Site identifier, or any URL on the site
        site: String,
    },

    /// Write a Markdown review sheet for a ledger
    Export {
        /// Site identifier, or any URL on the site
        site: String,

        /// Output path for the sheet
        path: PathBuf,
    },

    /// List sites with a ledger
    Sites,

    /// Validate the configuration and print it
    DryRun,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (Arc::new(cfg), hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let store = LedgerStore::new(&config.output.ledger_dir);

    match cli.command {
        Command::Discover { seed } => handle_discover(config, &seed, config_hash).await,
        Command::Scrape { site, statuses } => handle_scrape(config, &site, &statuses).await,
        Command::Mark {
            site,
            url,
            status,
            notes,
        } => handle_mark(&store, &site, &url, status, notes.as_deref()),
        Command::Curate { site } => handle_curate(&config, &store, &site),
        Command::Stats { site } => {
            let ledger = load_ledger(&store, &site)?;
            print_statistics(&ledger_statistics(&ledger));
            Ok(())
        }
        Command::Export { site, path } => {
            let ledger = load_ledger(&store, &site)?;
            write_review_sheet(&ledger, &path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("✓ Review sheet exported to: {}", path.display());
            Ok(())
        }
        Command::Sites => {
            for site in store.list_sites()? {
                println!("{}", site);
            }
            Ok(())
        }
        Command::DryRun => {
            handle_dry_run(&config, &config_hash);
            Ok(())
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
            0 => EnvFilter::new("crawl_ledger=info,warn"),
            1 => EnvFilter::new("crawl_ledger=debug,info"),
            2 => EnvFilter::new("crawl_ledger=trace,debug"),
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

fn load_ledger(store: &LedgerStore, site: &str) -> anyhow::Result<Ledger> {
    let site_id = resolve_site_id(site);
    match store.load(&site_id)? {
        Some(ledger) => Ok(ledger),
        None => bail!(
            "No ledger for site '{}' in {}",
            site_id,
            store.dir().display()
        ),
    }
}

async fn handle_discover(config: Arc<Config>, seed: &str, config_hash: String) -> anyhow::Result<()> {
    match discover(config, seed, Some(config_hash)).await {
        Ok(ledger) => {
            println!(
                "✓ {}: {} entries ({} pages scanned, run ended {})",
                ledger.site_id(),
                ledger.len(),
                ledger.metadata.pages_scanned,
                ledger
                    .metadata
                    .termination
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Discovery failed: {}", e);
            Err(e.into())
        }
    }
}

async fn handle_scrape(config: Arc<Config>, site: &str, statuses: &[LinkStatus]) -> anyhow::Result<()> {
    match scrape(Arc::clone(&config), site, statuses, None).await {
        Ok(report) => {
            println!(
                "✓ {}: {} of {} selected pages retrieved into {}",
                report.site_id, report.retrieved, report.requested, config.output.content_dir
            );
            for failure in &report.failed {
                println!("  ✗ {} ({})", failure.url, failure.outcome);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Scrape failed: {}", e);
            Err(e.into())
        }
    }
}

fn handle_mark(
    store: &LedgerStore,
    site: &str,
    url: &str,
    status: LinkStatus,
    notes: Option<&str>,
) -> anyhow::Result<()> {
    let mut ledger = load_ledger(store, site)?;
    let url = CanonicalUrl::parse(url);
    ledger.set_status(&url, status, notes)?;
    store.save(&ledger)?;
    println!("✓ {} -> {}", url, status);
    Ok(())
}

fn handle_curate(config: &Config, store: &LedgerStore, site: &str) -> anyhow::Result<()> {
    let policy = CurationPolicy::from_config(&config.curation)?;
    if policy.is_empty() {
        bail!("No [curation] keep/skip rules configured");
    }

    let mut ledger = load_ledger(store, site)?;
    let summary = ledger.apply_policy(&policy);
    store.save(&ledger)?;

    println!(
        "✓ {}: {} kept, {} skipped, {} still pending",
        ledger.site_id(),
        summary.kept,
        summary.skipped,
        summary.untouched
    );
    Ok(())
}

/// Validates config and shows what a run would use
fn handle_dry_run(config: &Config, config_hash: &str) {
    println!("=== Crawl-Ledger Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Workers: {}", config.crawler.workers);
    println!("  Host delay: {}ms", config.crawler.host_delay_ms);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!(
        "  Retries: {} (backoff {}ms, doubled)",
        config.crawler.max_retries, config.crawler.retry_backoff_ms
    );
    println!("  Follow external: {}", config.crawler.follow_external);
    println!("  Include subdomains: {}", config.crawler.include_subdomains);
    if !config.crawler.disabled_strategies.is_empty() {
        println!(
            "  Disabled strategies: {}",
            config.crawler.disabled_strategies.join(", ")
        );
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Ledgers: {}", config.output.ledger_dir);
    println!("  Content: {}", config.output.content_dir);
    println!("  Content backend: {:?}", config.output.content_backend);

    println!("\nCuration Rules:");
    println!("  Keep: {}", config.curation.keep.len());
    println!("  Skip: {}", config.curation.skip.len());

    println!("\nExtraction:");
    println!("  Chunk size: {} chars", config.extraction.chunk_size);

    println!("\n✓ Configuration is valid (hash: {})", config_hash);
}
