mod config;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use engine_logging::{engine_info, engine_warn};
use listing_engine::{
    ensure_output_dir, ErrorLog, FetchSettings, Harvester, PersistenceEngine,
    ReqwestImageFetcher, TradingApiTransport,
};

use crate::config::{Cli, RunConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let today = Local::now().date_naive();
    let config = RunConfig::resolve(cli, today, std::env::var_os("HOME").map(PathBuf::from))?;

    ensure_output_dir(&config.root)
        .with_context(|| format!("listing root {} is not writable", config.root.display()))?;
    logging::initialize(&config.root, config.verbose);

    let windows = config.windows(today)?;
    engine_info!(
        "Harvesting {} to {} into {} ({} windows{})",
        config.start,
        config.end,
        config.root.display(),
        windows.len(),
        if config.options.dry_run { ", dry run" } else { "" }
    );
    if windows.is_empty() {
        engine_warn!("No complete window before {today}; nothing to fetch");
    }

    let transport = TradingApiTransport::new(config.api.clone(), config.credentials.clone())
        .context("failed to build API client")?;
    let images = ReqwestImageFetcher::new(FetchSettings::for_images())
        .context("failed to build image client")?;
    let engine = PersistenceEngine::new(config.root.clone(), Arc::new(images));
    let error_log = ErrorLog::open(&config.root).context("failed to open error log")?;

    let mut harvester = Harvester::new(Arc::new(transport), engine, error_log, config.options);
    let summary = harvester.run(windows).await;

    println!(
        "{} persisted, {} skipped, {} failed, {} pages failed",
        summary.persisted, summary.skipped, summary.failed, summary.pages_failed
    );
    Ok(())
}
