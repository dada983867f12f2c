//! shortlist - example-driven catalog shortlist builder
//!
//! Subcommands:
//! - `scan`: build the reference profile, scan a catalog page range, commit
//!   matching tracks under `<output>/<genre>/`, print the result as JSON
//! - `profile`: print the reference profile of an examples directory
//! - `last-page`: print the catalog's last page number

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use shortlist_common::config::{load_config, CliOverrides, Settings};
use shortlist_common::logging::{init_tracing, with_bootstrap_logging};
use shortlist_common::ScanProgress;
use shortlist_engine::build_reference_profile;
use shortlist_engine::models::ScanRequest;
use shortlist_engine::services::{
    CatalogClient, CatalogSource, ContentFetcher, FeatureExtractor, ShortlistController,
    SpectralFeatureExtractor,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Command-line arguments for shortlist
#[derive(Parser, Debug)]
#[command(name = "shortlist")]
#[command(about = "Shortlist catalog tracks that sound like your examples")]
#[command(version)]
struct Cli {
    /// Config file (default: <config dir>/shortlist/config.toml)
    #[arg(long, global = true, env = "SHORTLIST_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a catalog page range and keep tracks similar to the examples
    Scan(ScanArgs),

    /// Print the reference profile built from an examples directory
    Profile {
        /// Directory of example audio files
        #[arg(long)]
        examples: PathBuf,
    },

    /// Print the estimated last catalog page
    LastPage,
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Directory of example audio files
    #[arg(long)]
    examples: PathBuf,

    /// Output directory for shortlisted tracks
    #[arg(long)]
    output: Option<PathBuf>,

    /// Root for transient downloads
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Genre to scan (repeatable)
    #[arg(long = "genre", required = true)]
    genres: Vec<String>,

    /// Release year to accept (repeatable; "Older" disables the year filter)
    #[arg(long = "year")]
    years: Vec<String>,

    /// Minimum similarity score (0.0-1.0)
    #[arg(long, default_value_t = 0.7)]
    threshold: f64,

    #[arg(long)]
    start_page: u32,

    #[arg(long)]
    end_page: u32,

    /// Also write the JSON result to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

impl ScanArgs {
    fn request(&self) -> ScanRequest {
        ScanRequest {
            genres: self.genres.iter().cloned().collect(),
            years: self.years.iter().cloned().collect(),
            threshold: self.threshold,
            start_page: self.start_page,
            end_page: self.end_page,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let overrides = match &cli.command {
        Command::Scan(args) => CliOverrides {
            output_dir: args.output.clone(),
            cache_dir: args.cache_dir.clone(),
        },
        _ => CliOverrides::default(),
    };

    let settings = with_bootstrap_logging(|| -> Result<Settings> {
        let config = load_config(cli.config.as_deref())?;
        Ok(Settings::resolve(config, overrides))
    })?;

    init_tracing(&settings.logging)?;
    info!("shortlist v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Scan(args) => run_scan(&args, &settings).await,
        Command::Profile { examples } => run_profile(examples).await,
        Command::LastPage => run_last_page(&settings).await,
    }
}

async fn run_scan(args: &ScanArgs, settings: &Settings) -> Result<()> {
    let request = args.request();
    request.validate()?;

    let extractor: Arc<dyn FeatureExtractor> = Arc::new(SpectralFeatureExtractor::new());
    let profile = build_reference_profile(&args.examples, Arc::clone(&extractor))
        .await
        .context("Failed to build reference profile")?;

    std::fs::create_dir_all(&settings.output_dir).with_context(|| {
        format!("Failed to create output directory {}", settings.output_dir.display())
    })?;
    std::fs::create_dir_all(&settings.cache_dir).with_context(|| {
        format!("Failed to create cache directory {}", settings.cache_dir.display())
    })?;

    // Per-run cache, purged when the scan ends
    let cache = tempfile::Builder::new()
        .prefix("scan-")
        .tempdir_in(&settings.cache_dir)
        .context("Failed to create scan cache")?;

    let catalog = Arc::new(CatalogClient::new(&settings.catalog, settings.api_token.clone())?);
    let fetcher = Arc::new(ContentFetcher::new(
        &settings.catalog,
        settings.api_token.clone(),
        settings.fetch.clone(),
        cache.path(),
    )?);
    let controller = ShortlistController::new(catalog, fetcher, extractor, &settings.output_dir);

    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, stopping after the current track");
            signal_token.cancel();
        }
    });

    let start_page = request.start_page;
    let progress = move |p: ScanProgress| {
        info!(
            page = p.current_page,
            position = p.position(start_page),
            total_pages = p.total_pages,
            kept = p.kept_count,
            percent = format!("{:.0}", p.percentage(start_page)),
            "Scan progress"
        );
    };
    let is_cancelled = || cancel_token.is_cancelled();

    let result = controller
        .run(&request, &profile, Some(&progress), &is_cancelled)
        .await;

    info!(
        scan_id = %result.scan_id,
        state = ?result.state,
        kept = result.kept,
        tracks_seen = result.stats.tracks_seen,
        rejected = result.stats.rejected,
        fetch_failures = result.stats.fetch_failures,
        extraction_failures = result.stats.extraction_failures,
        "Scan summary"
    );

    let json = serde_json::to_string_pretty(&result)?;
    println!("{json}");

    if let Err(e) = cache.close() {
        warn!(error = %e, "Failed to remove scan cache");
    }

    if let Some(report) = &args.report {
        write_report(report, &json)?;
        info!(report = %report.display(), "Report written");
    }

    Ok(())
}

fn write_report(path: &Path, json: &str) -> Result<()> {
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report {}", path.display()))
}

async fn run_profile(examples: PathBuf) -> Result<()> {
    let extractor: Arc<dyn FeatureExtractor> = Arc::new(SpectralFeatureExtractor::new());
    let profile = build_reference_profile(&examples, extractor)
        .await
        .context("Failed to build reference profile")?;

    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(())
}

async fn run_last_page(settings: &Settings) -> Result<()> {
    let client = CatalogClient::new(&settings.catalog, settings.api_token.clone())?;

    match client.estimate_last_page().await {
        Some(page) => println!("{page}"),
        None => println!("unavailable"),
    }
    Ok(())
}
