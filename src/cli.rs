//! CLI parsing and orchestration: scrape, verify, upload, and import
//! subcommands, with error classes mapped to distinct exit codes.

use std::cell::RefCell;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::catalog::{Catalog, ImportError, Importer};
use crate::config;
use crate::model::NovelSubmission;
use crate::scraper::{PoliteClient, ScrapeOptions, ScraperError};
use crate::upload;
use crate::verify;

const DEFAULT_BASE_URL: &str = "https://novelasligera.com";
const DEFAULT_OUTPUT_DIR: &str = "output";
const DEFAULT_CATALOG_PATH: &str = "catalog.sqlite";
const DEFAULT_UPLOAD_DIR: &str = "static/novels";
const DEFAULT_DELAY_SECS: u64 = 1;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRY_COUNT: u32 = 3;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Scraper(#[from] ScraperError),

    #[error("{0}")]
    Import(#[from] ImportError),

    #[error("Upload failed: {0:#}")]
    Upload(anyhow::Error),

    #[error("Submission failed verification")]
    VerificationFailed,
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Scraper(_) => 2,
            CliRunError::Import(_) => 3,
            CliRunError::Upload(_) => 4,
            CliRunError::VerificationFailed => 5,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "nlscrape")]
#[command(about = "Scrape NovelasLigera fiction and import it into a catalog")]
#[command(
    after_help = "Config file keys (base_url, output_dir, catalog_path, upload_dir, user_agent, \
                  request_delay_secs, timeout_secs, retry_count, retry_backoff_secs) are read \
                  from ./nlscrape.toml or the user config directory. CLI flags override config."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Print verbose error chain.
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape one novel into {output}/{slug}.json plus an adjacent cover image
    Scrape {
        /// Novel slug (the final URL path segment on the source site)
        slug: String,

        /// First chapter to fetch (1-based, inclusive)
        #[arg(long, default_value_t = 1)]
        start: u32,

        /// Last chapter to fetch (inclusive; default: all)
        #[arg(long)]
        end: Option<u32>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Source site root (overrides config)
        #[arg(long)]
        base_url: Option<String>,

        /// HTTP User-Agent (overrides config)
        #[arg(long)]
        user_agent: Option<String>,

        /// Delay between requests in seconds (overrides config; default 1)
        #[arg(long)]
        delay: Option<u64>,

        /// Request timeout in seconds (overrides config; default 30)
        #[arg(long)]
        timeout: Option<u64>,

        /// Suppress progress output (errors only)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Check a submission file; exits 0 only when it is import-ready
    Verify {
        /// Path to the submission JSON
        json_file: PathBuf,
    },

    /// POST a submission file to a remote import endpoint
    Upload {
        /// Path to the submission JSON
        json_file: PathBuf,

        /// Import endpoint URL
        #[arg(long)]
        url: String,

        /// Bearer key for authenticated endpoints
        #[arg(long)]
        key: Option<String>,

        /// Request timeout in seconds
        #[arg(long, default_value_t = upload::DEFAULT_UPLOAD_TIMEOUT_SECS)]
        timeout: u64,
    },

    /// Import a submission file into the local catalog
    Import {
        /// Path to the submission JSON
        json_file: PathBuf,

        /// Catalog database file (overrides config)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Cover upload directory (overrides config)
        #[arg(long)]
        upload_dir: Option<PathBuf>,
    },
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code
/// and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let config = config::load_config().map_err(CliRunError::InvalidInput)?;

    match &args.command {
        Command::Scrape {
            slug,
            start,
            end,
            output,
            base_url,
            user_agent,
            delay,
            timeout,
            quiet,
        } => run_scrape(
            &config, slug, *start, *end, output, base_url, user_agent, *delay, *timeout, *quiet,
        ),
        Command::Verify { json_file } => {
            let report = verify::verify_file(json_file)
                .map_err(|e| CliRunError::InvalidInput(format!("{:#}", e)))?;
            report.print();
            if report.is_valid() {
                Ok(())
            } else {
                Err(CliRunError::VerificationFailed)
            }
        }
        Command::Upload { json_file, url, key, timeout } => {
            let response = upload::upload_file(json_file, url, key.as_deref(), *timeout)
                .map_err(CliRunError::Upload)?;
            println!("{}", response);
            Ok(())
        }
        Command::Import { json_file, catalog, upload_dir } => {
            let catalog_path = catalog
                .clone()
                .or_else(|| config.as_ref().and_then(|c| c.catalog_path.clone()))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG_PATH));
            let upload_dir = upload_dir
                .clone()
                .or_else(|| config.as_ref().and_then(|c| c.upload_dir.clone()))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR));

            let raw = std::fs::read_to_string(json_file).map_err(|e| {
                CliRunError::InvalidInput(format!("Cannot read {}: {}", json_file.display(), e))
            })?;
            let submission: NovelSubmission = serde_json::from_str(&raw).map_err(|e| {
                CliRunError::InvalidInput(format!(
                    "Invalid submission JSON in {}: {}",
                    json_file.display(),
                    e
                ))
            })?;

            let catalog = Catalog::open(&catalog_path).map_err(ImportError::Store)?;
            let importer = Importer::new(&catalog, upload_dir);
            let response = importer.import(&submission)?;

            eprintln!("{}", response.message);
            println!(
                "{}",
                serde_json::to_string_pretty(&response).map_err(|e| {
                    CliRunError::InvalidInput(format!("Failed to render response: {}", e))
                })?
            );
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_scrape(
    config: &Option<config::Config>,
    slug: &str,
    start: u32,
    end: Option<u32>,
    output: &Option<PathBuf>,
    base_url: &Option<String>,
    user_agent: &Option<String>,
    delay: Option<u64>,
    timeout: Option<u64>,
    quiet: bool,
) -> Result<(), CliRunError> {
    if let Some(end) = end {
        if start > end {
            return Err(CliRunError::InvalidInput(format!(
                "Invalid range: --start ({}) must be <= --end ({})",
                start, end
            )));
        }
    }

    let base_url = base_url
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.base_url.clone()))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let base_url = base_url.trim_end_matches('/').to_string();

    let output_dir = output
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.output_dir.clone()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

    let delay_secs = delay
        .or_else(|| config.as_ref().and_then(|c| c.request_delay_secs))
        .unwrap_or(DEFAULT_DELAY_SECS);
    let timeout_secs = timeout
        .or_else(|| config.as_ref().and_then(|c| c.timeout_secs))
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    let retry_count = config
        .as_ref()
        .and_then(|c| c.retry_count)
        .unwrap_or(DEFAULT_RETRY_COUNT)
        .max(1);
    let retry_backoff_secs = config
        .as_ref()
        .and_then(|c| c.retry_backoff_secs.clone())
        .unwrap_or_else(|| vec![1, 2]);
    let user_agent = user_agent
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.user_agent.clone()));

    let mut builder = PoliteClient::builder()
        .delay_secs(delay_secs)
        .timeout_secs(timeout_secs)
        .retry_count(retry_count)
        .retry_backoff_secs(retry_backoff_secs);
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    let mut client = builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))?;

    let progress_state: RefCell<Option<indicatif::ProgressBar>> = RefCell::new(None);
    let progress_cb = |n: u32, total: u32| {
        if total == 0 {
            return;
        }
        let mut state = progress_state.borrow_mut();
        let pb = state.get_or_insert_with(|| {
            let bar = indicatif::ProgressBar::new(total as u64);
            bar.set_style(
                indicatif::ProgressStyle::default_bar()
                    .template("{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})")
                    .unwrap()
                    .progress_chars("█▉▊▋▌▍▎▏ "),
            );
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        pb.set_position(n as u64);
        pb.set_message(format!("Fetching chapter {}/{}", n, total));
    };
    let progress: Option<&dyn Fn(u32, u32)> = if quiet { None } else { Some(&progress_cb) };

    let options = ScrapeOptions { start, end, output_dir: &output_dir, progress };
    let outcome = crate::scraper::scrape_novel(&mut client, &base_url, slug, &options)?;

    if let Some(pb) = progress_state.borrow_mut().take() {
        pb.disable_steady_tick();
        pb.finish_and_clear();
    }

    if !quiet {
        eprintln!(
            "Scraped {} chapter(s) of '{}' ({} skipped)",
            outcome.downloaded,
            outcome.novel.name,
            outcome.skipped.len()
        );
        if !outcome.skipped.is_empty() {
            let ordinals: Vec<String> =
                outcome.skipped.iter().map(|s| s.number.to_string()).collect();
            eprintln!("Skipped chapters: {}", ordinals.join(", "));
        }
        match outcome.novel.image_path {
            Some(ref path) => eprintln!("Cover saved to {}", path),
            None => eprintln!("No cover image saved"),
        }
        eprintln!("Wrote {}", outcome.json_path.display());
    }
    Ok(())
}
