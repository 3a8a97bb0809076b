//! POI Sweep main entry point
//!
//! This is the command-line interface for the POI Sweep adaptive crawler.

use clap::Parser;
use poi_sweep::config::{load_config_with_hash, validate_request, Config};
use poi_sweep::crawler::CrawlOrchestrator;
use poi_sweep::output::{print_statistics, write_cells, write_records, CrawlStatistics};
use poi_sweep::places::TypeFilter;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// POI Sweep: an adaptive spatial crawler for place-search APIs
///
/// POI Sweep finds every place matching a keyword across an area by
/// subdividing the search grid wherever the API truncates results, then
/// fetches full details once per unique place.
#[derive(Parser, Debug)]
#[command(name = "poi-sweep")]
#[command(version)]
#[command(about = "Adaptive spatial POI crawler", long_about = None)]
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

    /// Search terms (overrides [crawl] keywords)
    #[arg(long)]
    keywords: Option<String>,

    /// Location to crawl (overrides [crawl] location)
    #[arg(long)]
    location: Option<String>,

    /// Place type to query separately; repeat for several (overrides [crawl] primary-types)
    #[arg(long = "type", value_name = "TYPE")]
    types: Vec<String>,

    /// Stop after this many unique places
    #[arg(long, value_name = "N")]
    max_results: Option<usize>,

    /// Write JSON lines here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Also write every processed cell and its state as JSON lines
    #[arg(long, value_name = "PATH")]
    cells: Option<PathBuf>,

    /// Validate config and show what would be crawled without calling any API
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(keywords) = &self.keywords {
            config.crawl.keywords = keywords.clone();
        }
        if let Some(location) = &self.location {
            config.crawl.location = location.clone();
        }
        if !self.types.is_empty() {
            config.crawl.primary_types = self.types.clone();
        }
        if self.max_results.is_some() {
            config.crawl.max_results = self.max_results;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    cli.apply_overrides(&mut config);

    if let Err(e) = validate_request(&config) {
        tracing::error!("Invalid crawl request: {}", e);
        return Err(e.into());
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, &cli).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr; stdout carries place records.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("poi_sweep=info,warn"),
            1 => EnvFilter::new("poi_sweep=debug,info"),
            2 => EnvFilter::new("poi_sweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) {
    let crawl = &config.crawl;
    println!("=== POI Sweep Dry Run ===\n");

    println!("Query:");
    println!("  Text: \"{} in {}\"", crawl.keywords.trim(), crawl.location.trim());
    let types = TypeFilter::list_from(&crawl.primary_types);
    println!(
        "  Type passes per cell ({}): {}",
        types.len(),
        types
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    match crawl.max_results {
        Some(max) => println!("  Max results: {}", max),
        None => println!("  Max results: unlimited"),
    }

    println!("\nGrid:");
    println!("  Max depth: {}", crawl.max_depth);
    println!("  Page cap: {} ({} pages of {})", crawl.page_cap, crawl.max_pages, crawl.page_size);
    println!("  Min cell span: {}°", crawl.min_cell_span);
    println!("  Boundary clipping: {}", crawl.use_boundary);

    println!("\nRuntime:");
    println!("  Max concurrent requests: {}", config.runtime.max_concurrent_requests);
    println!("  Request timeout: {}s", config.runtime.request_timeout_secs);
    println!(
        "  Retries: {} (backoff from {}ms)",
        config.runtime.max_retries, config.runtime.backoff_base_ms
    );

    println!("\nDetail fields: {}", config.attributes.field_mask().join(", "));

    // Worst case: every cell at every level is capped
    let max_cells: u64 = (0..=crawl.max_depth).map(|d| 4u64.pow(d)).sum();
    println!("\n✓ Configuration is valid");
    println!(
        "✓ At most {} cells × {} type pass(es) would be searched",
        max_cells,
        types.len()
    );
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Crawling \"{}\" in \"{}\" (max depth {})",
        config.crawl.keywords,
        config.crawl.location,
        config.crawl.max_depth
    );

    let orchestrator = CrawlOrchestrator::from_config(config)?;

    // Ctrl-C stops dispatching new work; partial results are still written
    let cancel = orchestrator.cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight requests");
            cancel.cancel();
        }
    });

    let report = match orchestrator.run().await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    let written = write_records(cli.output.as_deref(), &report.records)?;
    if let Some(path) = &cli.output {
        tracing::info!("Wrote {} places to {}", written, path.display());
    }
    if let Some(path) = &cli.cells {
        let cells = write_cells(path, &report.cells)?;
        tracing::info!("Wrote {} cells to {}", cells, path.display());
    }

    for failure in &report.failures {
        tracing::warn!("{}", failure);
    }

    if !cli.quiet {
        print_statistics(&CrawlStatistics::from_report(&report));
    }

    Ok(())
}
