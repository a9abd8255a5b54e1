//! Outreach-Enrich main entry point
//!
//! This is the command-line interface the scheduler calls to enroll websites
//! and run enrichment batches.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use outreach_enrich::config::{load_config_with_hash, Config};
use outreach_enrich::output::{
    format_batch_summary, format_contact_record, format_validation_report, load_statistics,
    print_statistics,
};
use outreach_enrich::pipeline::{CandidateSelector, Pipeline};
use outreach_enrich::store::{open_store, OpportunityStatus, SqliteStore};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Outreach-Enrich: opportunity validation and contact extraction
///
/// Decides whether candidate websites are worth pitching and finds out how to
/// reach their owners, politely and one domain at a time.
#[derive(Parser, Debug)]
#[command(name = "outreach-enrich")]
#[command(version = "1.0.0")]
#[command(about = "Opportunity validation and contact extraction", long_about = None)]
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
    /// Add websites as discovered opportunities
    Enroll {
        /// Homepage URLs or bare domains
        #[arg(value_name = "URL", required = true)]
        urls: Vec<String>,
    },

    /// Validate and extract contacts for a batch of opportunities
    RunBatch {
        /// Maximum opportunities in this batch
        #[arg(long)]
        limit: Option<usize>,

        /// Number of concurrent workers (1-32)
        #[arg(long)]
        concurrency: Option<usize>,

        /// Statuses to select (repeatable, default: discovered)
        #[arg(long = "status", value_name = "STATUS")]
        statuses: Vec<OpportunityStatus>,

        /// Only opportunities without an email or contact form
        #[arg(long)]
        missing_contacts: bool,

        /// Only premium opportunities
        #[arg(long)]
        premium_only: bool,
    },

    /// Extract contacts for one opportunity
    Extract {
        /// Opportunity ID
        id: i64,
    },

    /// Validate a domain without storing anything
    Validate {
        /// Domain or homepage URL
        domain: String,
    },

    /// Show statistics from the database
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    match cli.command {
        Command::Stats => handle_stats(&config),
        Command::Enroll { urls } => handle_enroll(&config, config_hash, &urls),
        Command::RunBatch {
            limit,
            concurrency,
            statuses,
            missing_contacts,
            premium_only,
        } => {
            let selector = CandidateSelector {
                statuses: if statuses.is_empty() {
                    vec![OpportunityStatus::Discovered]
                } else {
                    statuses
                },
                missing_contacts,
                premium_only,
                limit,
            };
            handle_run_batch(&config, config_hash, &selector, concurrency.unwrap_or(0)).await
        }
        Command::Extract { id } => handle_extract(&config, config_hash, id).await,
        Command::Validate { domain } => handle_validate(&config, config_hash, &domain).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("outreach_enrich=info,warn"),
            1 => EnvFilter::new("outreach_enrich=debug,info"),
            2 => EnvFilter::new("outreach_enrich=trace,debug"),
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

fn open(config: &Config) -> anyhow::Result<SqliteStore> {
    let path = Path::new(&config.storage.database_path);
    open_store(path).with_context(|| format!("failed to open database {}", path.display()))
}

fn build_pipeline(config: &Config, config_hash: String) -> anyhow::Result<Pipeline<SqliteStore>> {
    let store = open(config)?;
    Pipeline::new(config, config_hash, store).context("failed to build pipeline")
}

/// Handles `stats`: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let store = open(config)?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles `enroll`: adds each URL, reporting the ones that are invalid
fn handle_enroll(config: &Config, config_hash: String, urls: &[String]) -> anyhow::Result<()> {
    let pipeline = build_pipeline(config, config_hash)?;

    let mut rejected = 0;
    for url in urls {
        match pipeline.enroll(url) {
            Ok(id) => println!("{}\t{}", id, url),
            Err(e) => {
                rejected += 1;
                tracing::error!("Cannot enroll {}: {}", url, e);
            }
        }
    }

    if rejected > 0 {
        bail!("{} of {} URLs could not be enrolled", rejected, urls.len());
    }
    Ok(())
}

/// Handles `run-batch`
async fn handle_run_batch(
    config: &Config,
    config_hash: String,
    selector: &CandidateSelector,
    concurrency: usize,
) -> anyhow::Result<()> {
    let pipeline = build_pipeline(config, config_hash)?;

    let summary = pipeline
        .run_batch(selector, concurrency)
        .await
        .context("batch failed to start")?;

    println!("{}", format_batch_summary(&summary));
    Ok(())
}

/// Handles `extract`
async fn handle_extract(config: &Config, config_hash: String, id: i64) -> anyhow::Result<()> {
    let pipeline = build_pipeline(config, config_hash)?;
    let record = pipeline.extract_contacts(id).await?;
    print!("{}", format_contact_record(&record));
    Ok(())
}

/// Handles `validate`
async fn handle_validate(config: &Config, config_hash: String, domain: &str) -> anyhow::Result<()> {
    let pipeline = build_pipeline(config, config_hash)?;
    let report = pipeline.validate_domain(domain).await;
    print!("{}", format_validation_report(&report));
    Ok(())
}
