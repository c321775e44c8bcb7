//! Sumi-Glean main entry point
//!
//! This is the command-line interface for the Sumi-Glean extraction engine.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use sumi_glean::config::{load_config_with_hash, Config};
use sumi_glean::crawler::ProgressEvent;
use sumi_glean::extract::parse_selector_lines;
use sumi_glean::job::{JobContext, JobController, JobMode, JobRequest};
use sumi_glean::storage::SqliteStore;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Sumi-Glean: structured data extraction from web pages
///
/// Sumi-Glean fetches a page, a sitemap, or a bounded breadth-first crawl,
/// applies CSS selector rules to every page and reports the results.
#[derive(Parser, Debug)]
#[command(name = "sumi-glean")]
#[command(version)]
#[command(about = "Structured data extraction from web pages", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

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
    /// Run a job described by command-line flags
    Run(RunArgs),

    /// Run a job described by a JSON or TOML request file
    Job {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print an archived job from the SQLite database
    Export {
        #[arg(value_name = "JOB_ID")]
        job_id: String,
    },

    /// Validate the configuration and print the effective settings
    Check,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Root URL (page, sitemap or crawl start)
    #[arg(long)]
    url: String,

    /// Job mode: single, sitemap or crawl
    #[arg(long, default_value = "single")]
    mode: JobMode,

    /// Selectors as a JSON object of field name to rule
    #[arg(long, conflicts_with = "selectors_file")]
    selectors: Option<String>,

    /// Selectors file with one `field: selector` per line
    #[arg(long, value_name = "FILE")]
    selectors_file: Option<PathBuf>,

    /// Page budget (1..=1000)
    #[arg(long, default_value_t = 100)]
    max_pages: i64,

    /// Follow and accept links on other hosts
    #[arg(long)]
    all_domains: bool,

    /// Fetch pages with the headless browser
    #[arg(long)]
    render: bool,

    /// Settle time after page load when rendering (milliseconds)
    #[arg(long, default_value_t = 0)]
    wait_ms: u64,

    /// Crawl depth ceiling (crawl mode)
    #[arg(long)]
    max_depth: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config_path = cli.config.as_deref();
    if let Some(path) = config_path {
        tracing::info!("Loading configuration from: {}", path.display());
    }
    let (config, hash) = match load_config_with_hash(config_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    tracing::info!("Configuration loaded (hash: {})", &hash[..12]);

    match cli.command {
        Command::Run(args) => {
            let request = build_request(args)?;
            handle_job(config, request).await
        }
        Command::Job { file } => {
            let request = JobRequest::load(&file)
                .with_context(|| format!("failed to read job file {}", file.display()))?;
            handle_job(config, request).await
        }
        Command::Export { job_id } => handle_export(&config, &job_id),
        Command::Check => {
            handle_check(&config);
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_glean=info,warn"),
            1 => EnvFilter::new("sumi_glean=debug,info"),
            2 => EnvFilter::new("sumi_glean=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so stdout carries only the envelope
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Turns `run` flags into a job request
fn build_request(args: RunArgs) -> anyhow::Result<JobRequest> {
    let selectors = match (args.selectors, args.selectors_file) {
        (Some(json), _) => {
            serde_json::from_str(&json).context("--selectors is not valid JSON")?
        }
        (None, Some(path)) => read_selectors_file(&path)?,
        (None, None) => serde_json::Value::Null,
    };

    let mut request = JobRequest::new(args.url);
    request.mode = args.mode;
    request.selectors = selectors;
    request.max_pages = args.max_pages;
    request.same_domain_only = !args.all_domains;
    request.use_renderer = args.render;
    request.render_wait_ms = args.wait_ms;
    request.max_depth = args.max_depth;
    Ok(request)
}

fn read_selectors_file(path: &Path) -> anyhow::Result<serde_json::Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read selectors file {}", path.display()))?;
    let rules = parse_selector_lines(&text)
        .with_context(|| format!("invalid selectors file {}", path.display()))?;
    Ok(serde_json::to_value(rules)?)
}

/// Runs one job to completion and prints its envelope
async fn handle_job(config: Config, request: JobRequest) -> anyhow::Result<()> {
    tracing::info!(
        "Starting {} job for {} (max pages: {})",
        request.mode,
        request.url,
        request.max_pages
    );

    let controller = JobController::from_config(config).context("failed to set up job")?;
    let (ctx, progress) = controller.new_context();
    let reporter = tokio::spawn(log_progress(progress));
    watch_interrupt(&ctx);

    let envelope = controller.submit(&request, ctx).await;
    let _ = reporter.await;

    println!("{}", envelope.to_json_pretty()?);

    if envelope.success {
        tracing::info!("{}", envelope.message);
        Ok(())
    } else {
        bail!("{}", envelope.message)
    }
}

async fn log_progress(mut progress: mpsc::Receiver<ProgressEvent>) {
    while let Some(event) = progress.recv().await {
        if event.failed {
            tracing::info!(
                "[{}/{}] {} (failed)",
                event.visited,
                event.max_pages,
                event.url
            );
        } else {
            tracing::info!("[{}/{}] {}", event.visited, event.max_pages, event.url);
        }
    }
}

/// Stops the job on Ctrl-C
fn watch_interrupt(ctx: &JobContext) {
    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current batch");
            cancel.cancel();
        }
    });
}

/// Handles `export`: prints an archived job as JSON
fn handle_export(config: &Config, job_id: &str) -> anyhow::Result<()> {
    let Some(database) = config.output.database_path.as_deref() else {
        bail!("no database configured (set [output] database-path)");
    };

    let store = SqliteStore::open(Path::new(database))
        .with_context(|| format!("failed to open database {}", database))?;
    let job = store.load_job(job_id)?;
    let result = store.load_result(job_id)?;

    tracing::info!(
        "Job {}: {} {} ({}, {} visited, {} errors)",
        job.id,
        job.mode,
        job.root_url,
        job.state,
        job.total_visited,
        job.total_errors
    );

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Handles `check`: prints the effective configuration
fn handle_check(config: &Config) {
    println!("=== Sumi-Glean Configuration ===\n");

    println!("Fetch:");
    println!("  User agent: {}", config.fetch.user_agent);
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    println!("  Connect timeout: {}s", config.fetch.connect_timeout_secs);

    println!("\nRender:");
    println!("  Page timeout: {}s", config.render.page_timeout_secs);
    println!("  No sandbox: {}", config.render.no_sandbox);
    println!(
        "  Browser: {}",
        config.render.chrome_path.as_deref().unwrap_or("auto-detect")
    );

    println!("\nCrawl:");
    println!("  Workers: {}", config.crawl.workers);
    println!("  Max depth: {}", config.crawl.max_depth);
    println!(
        "  Max consecutive failures: {}",
        config.crawl.max_consecutive_failures
    );
    println!("  Request delay: {}ms", config.crawl.request_delay_ms);
    println!("  Job deadline: {}s", config.crawl.job_deadline_secs);
    println!("  Sitemap max depth: {}", config.crawl.sitemap_max_depth);

    println!("\nOutput:");
    println!("  Download dir: {}", config.output.download_dir);
    println!("  Download prefix: {}", config.output.download_url_prefix);
    println!(
        "  Database: {}",
        config.output.database_path.as_deref().unwrap_or("(none)")
    );

    println!("\n✓ Configuration is valid");
}
