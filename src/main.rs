//! # Sitemap Watch
//!
//! Command-line entry point. Loads the configuration and the JSON store,
//! runs one monitoring pass and prints the results as JSON.
//!
//! ## Usage
//!
//! ```sh
//! sitemap_watch --store ./data/store.json run-all
//! ```

use clap::Parser;
use serde_json::json;
use sitemap_watch::http::ReqwestFetcher;
use sitemap_watch::store::JsonStore;
use sitemap_watch::utils::ensure_writable_parent;
use sitemap_watch::{MonitorConfig, MonitorOrchestrator, RunSummary};
use std::error::Error;
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    info!("sitemap_watch starting up");

    let args = Cli::parse();
    debug!(?args.store, ?args.config, ?args.command, "Parsed CLI arguments");

    // ---- Config ----
    let mut config = MonitorConfig::load(args.config.as_deref()).await?;
    if let Some(site_concurrency) = args.site_concurrency {
        config.site_concurrency = site_concurrency;
    }
    info!(
        max_new_urls = config.max_new_urls,
        page_concurrency = config.pages.max_concurrent,
        site_concurrency = config.site_concurrency,
        title_rules = config.title_rules.len(),
        "Configuration ready"
    );

    // ---- Store ----
    if let Err(e) = ensure_writable_parent(&args.store).await {
        error!(
            path = %args.store.display(),
            error = %e,
            "Store directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }
    let store = JsonStore::open(&args.store).await?;

    let http = ReqwestFetcher::new(reqwest::Client::builder().build()?);
    let monitor = MonitorOrchestrator::from_config(store, http, &config)?;

    let output = match args.command {
        Command::RunAll => {
            let results = monitor.monitor_all_websites().await?;
            let summary = RunSummary::from_results(&results);
            json!({ "summary": summary, "results": results })
        }
        Command::Run { site_id } => {
            let results = vec![monitor.monitor_website(&site_id).await];
            let summary = RunSummary::from_results(&results);
            json!({ "summary": summary, "results": results })
        }
        Command::Stats { site_id } => {
            let stats = monitor.preview(&site_id).await?;
            json!({ "site_id": site_id, "stats": stats })
        }
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
