//! Driftnet main entry point
//!
//! This is the command-line interface for the driftnet documentation
//! capture crawler.

use anyhow::{bail, Context};
use clap::Parser;
use driftnet::config::{load_profile, CrawlOptions};
use driftnet::crawler::CrawlRegistry;
use driftnet::discover::HtmlDiscovery;
use driftnet::render::HttpRenderer;
use driftnet::storage::{open_store, PageStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Driftnet: a render-aware documentation capture crawler
///
/// Driftnet crawls documentation sites from seed URLs, deduplicates
/// pages by content hash, and stores captured content incrementally so
/// an interrupted crawl loses nothing already saved.
#[derive(Parser, Debug)]
#[command(name = "driftnet")]
#[command(version)]
#[command(about = "A render-aware documentation capture crawler", long_about = None)]
struct Cli {
    /// Seed URLs to crawl (omit when using --config)
    #[arg(value_name = "SEED_URL")]
    seeds: Vec<String>,

    /// Path to a TOML crawl profile
    #[arg(short, long, value_name = "PROFILE")]
    config: Option<PathBuf>,

    /// Path to the capture database
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,

    /// Number of concurrent workers (1-10)
    #[arg(short, long)]
    workers: Option<u32>,

    /// Maximum unique pages captured per seed
    #[arg(short, long, value_name = "N")]
    page_limit: Option<u32>,

    /// Match any URL on a seed's host, not just those under its path
    #[arg(long)]
    loose_paths: bool,

    /// Re-render every page even when a prior job already captured it
    #[arg(long)]
    skip_cache: bool,

    /// Follow links that leave the seed scopes (bounded by --max-hops)
    #[arg(long)]
    follow_external: bool,

    /// Maximum hops away from seed scope for external links (1-5)
    #[arg(long, value_name = "N")]
    max_hops: Option<u32>,

    /// Per-page render timeout in milliseconds
    #[arg(long, value_name = "MS")]
    render_timeout_ms: Option<u64>,

    /// Delay between requests per worker in milliseconds
    #[arg(long, value_name = "MS")]
    request_delay_ms: Option<u64>,

    /// Content-readiness hint forwarded to the renderer (repeatable)
    #[arg(long, value_name = "HINT")]
    wait_hint: Vec<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "delete_job")]
    stats: bool,

    /// Delete a job and all of its captured pages, then exit
    #[arg(long, value_name = "JOB_ID", conflicts_with = "stats")]
    delete_job: Option<i64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    // Profile first, CLI flags override.
    let (mut seeds, mut database, mut options) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading crawl profile from: {}", path.display());
            let profile = load_profile(path)
                .with_context(|| format!("failed to load profile {}", path.display()))?;
            (
                profile.seeds,
                PathBuf::from(profile.database_path),
                profile.options,
            )
        }
        None => (
            Vec::new(),
            PathBuf::from("./driftnet.db"),
            CrawlOptions::default(),
        ),
    };
    if !cli.seeds.is_empty() {
        seeds = cli.seeds.clone();
    }
    if let Some(path) = &cli.database {
        database = path.clone();
    }
    apply_cli_overrides(&mut options, &cli);
    driftnet::config::validate_options(&options)?;

    if cli.stats {
        handle_stats(&database)?;
    } else if let Some(job_id) = cli.delete_job {
        handle_delete_job(&database, job_id)?;
    } else {
        handle_crawl(&database, seeds, options).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("driftnet=info,warn"),
            1 => EnvFilter::new("driftnet=debug,info"),
            2 => EnvFilter::new("driftnet=trace,debug"),
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

fn apply_cli_overrides(options: &mut CrawlOptions, cli: &Cli) {
    if let Some(workers) = cli.workers {
        options.max_workers = workers as usize;
    }
    if let Some(limit) = cli.page_limit {
        options.page_limit_per_seed = Some(limit);
    }
    if cli.loose_paths {
        options.strict_path_matching = false;
    }
    if cli.skip_cache {
        options.skip_cache = true;
    }
    if cli.follow_external {
        options.follow_external_links = true;
    }
    if let Some(hops) = cli.max_hops {
        options.max_external_hops = hops;
    }
    if let Some(ms) = cli.render_timeout_ms {
        options.render_timeout_ms = ms;
    }
    if let Some(ms) = cli.request_delay_ms {
        options.request_delay_ms = ms;
    }
    if !cli.wait_hint.is_empty() {
        options.wait_hints = cli.wait_hint.clone();
    }
}

/// Handles the main crawl operation
async fn handle_crawl(
    database: &PathBuf,
    seeds: Vec<String>,
    options: CrawlOptions,
) -> anyhow::Result<()> {
    if seeds.is_empty() {
        bail!("no seed URLs given (pass them as arguments or via --config)");
    }

    let store = Arc::new(open_store(database)?);
    let renderer = Arc::new(HttpRenderer::new(options.render_timeout())?);
    let discovery = Arc::new(HtmlDiscovery::new()?);
    let registry = CrawlRegistry::new(store.clone(), discovery, renderer);

    let _subscription = registry.on_progress(|snapshot| {
        tracing::info!(
            "progress: {} found, {} captured, {} failed, {} queued",
            snapshot.pages_found,
            snapshot.pages_processed,
            snapshot.pages_failed,
            snapshot.queue_size
        );
    });

    let job = registry.start(&seeds, options).await?;
    tracing::info!("Crawl started as job {}", job.id());

    // Fire-and-poll: the registry slot empties when the job finishes.
    while registry.get_active().is_some() {
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    let record = registry
        .status(job.id())?
        .context("job record disappeared during crawl")?;
    let captured = store.count_pages(job.id())?;

    println!("\n=== Crawl Summary ===");
    println!("Job:             {}", record.id);
    println!("Status:          {}", record.status);
    println!("Pages found:     {}", record.pages_found);
    println!("Pages captured:  {}", captured);
    println!("Pages failed:    {}", record.pages_failed);

    if record.pages_failed > 0 {
        println!("\nErrors:");
        for error in store.get_job_errors(record.id)? {
            println!("  - {}: {}", error.url, error.message);
        }
    }

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(database: &PathBuf) -> anyhow::Result<()> {
    let store = open_store(database)?;
    println!("Database: {}\n", database.display());

    match store.latest_job()? {
        Some(job) => {
            let captured = store.count_pages(job.id)?;
            println!("Latest job:      {}", job.id);
            println!("Seeds:           {}", job.seed_urls.join(", "));
            println!("Status:          {}", job.status);
            println!("Pages found:     {}", job.pages_found);
            println!("Pages captured:  {}", captured);
            println!("Pages failed:    {}", job.pages_failed);
            println!("Created:         {}", job.created_at);
            println!("Updated:         {}", job.updated_at);
        }
        None => println!("No jobs recorded yet."),
    }

    Ok(())
}

/// Handles the --delete-job mode: removes a job and its pages
fn handle_delete_job(database: &PathBuf, job_id: i64) -> anyhow::Result<()> {
    let store = open_store(database)?;
    store.delete_job(job_id)?;
    println!("✓ Deleted job {} and its captured pages", job_id);
    Ok(())
}
