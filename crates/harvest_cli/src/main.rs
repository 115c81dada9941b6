mod config;
mod roster;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use harvest_engine::{
    fill_missing_sites, run_harvest, AtomicFileWriter, ArchiveFetcher, CachedSiteSource,
    CdxClient, Harvester, LookupTable, ProgressTracker, RateLimiter, RecordWriter, SiteSource,
    DEFAULT_CACHE_TTL_SECS, RUN_SUMMARY_FILE,
};
use harvest_logging::{harvest_info, harvest_warn, LogDestination};
use tokio_util::sync::CancellationToken;

use crate::config::HarvestConfig;

#[derive(Parser, Debug)]
#[command(
    name = "archive-harvest",
    about = "Harvest archived campaign-site text from the Wayback Machine"
)]
struct Cli {
    /// JSON Lines roster of targets to harvest.
    #[arg(long)]
    roster: PathBuf,

    /// RON run configuration; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Concurrent targets. 1 runs sequentially with a pause between targets.
    #[arg(long)]
    workers: Option<usize>,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    log_level: String,

    /// Also write the log to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Lookup table of site URLs used to fill roster entries without one.
    #[arg(long)]
    site_cache: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let destination = match &cli.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    };
    harvest_logging::initialize(destination, harvest_logging::parse_level(&cli.log_level));

    let mut config = match &cli.config {
        Some(path) => HarvestConfig::load(path)?,
        None => HarvestConfig::default(),
    };
    if let Some(workers) = cli.workers {
        config.run.workers = workers;
    }
    if let Some(dir) = &cli.output_dir {
        config.run.output_dir = dir.clone();
    }

    let mut targets = roster::load_roster(&cli.roster)?;
    if let Some(path) = &cli.site_cache {
        let table = LookupTable::open(path, DEFAULT_CACHE_TTL_SECS)
            .with_context(|| format!("failed to open site cache {}", path.display()))?;
        let cache = CachedSiteSource::new(table);
        cache.remember(&targets)?;
        let sources: Vec<Box<dyn SiteSource>> = vec![Box::new(cache)];
        fill_missing_sites(&sources, &mut targets).await;
    }

    let limiter = Arc::new(RateLimiter::new(config.rate_limit_settings()));
    let index = CdxClient::new(config.index_settings(), limiter.clone())?;
    let fetcher = ArchiveFetcher::new(config.fetch_settings(), limiter)?;
    let progress_path = ProgressTracker::path_for_roster(&config.run.progress_dir, &cli.roster);
    let progress = ProgressTracker::open(&progress_path)
        .with_context(|| format!("failed to open progress file {}", progress_path.display()))?;
    harvest_info!(
        "Resuming from {:?}: {} units already attempted",
        progress.path(),
        progress.len()
    );
    let records = RecordWriter::new(&config.run.output_dir)?;

    let harvester = Harvester::new(
        Arc::new(index),
        Arc::new(fetcher),
        Arc::new(progress),
        Arc::new(records),
    )
    .with_frames(config.frame_extractor())
    .with_settings(config.harvest_settings()?);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            harvest_warn!("Interrupted; no new targets will start");
            on_interrupt.cancel();
        }
    });

    let summary = run_harvest(
        Arc::new(harvester),
        targets,
        config.pool_settings(),
        cancel,
    )
    .await;

    let summary_path = AtomicFileWriter::new(config.run.output_dir.clone())
        .write_json(RUN_SUMMARY_FILE, &summary)?;
    harvest_info!("Run summary written to {:?}", summary_path);
    Ok(())
}
