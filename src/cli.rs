//! Command-line interface definitions for Sitemap Watch.
//!
//! This module defines the CLI arguments and subcommands using the `clap`
//! crate. Global options can also be provided through environment variables.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the Sitemap Watch application.
///
/// # Examples
///
/// ```sh
/// # Check every active site once
/// sitemap_watch --store ./data/store.json run-all
///
/// # Check one site with a custom configuration
/// sitemap_watch -s ./data/store.json -c ./monitor.yaml run site-42
///
/// # See what a run would pick up, without writing anything
/// sitemap_watch -s ./data/store.json stats site-42
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the JSON store holding sites, findings and run logs
    #[arg(short, long, env = "SITEMAP_WATCH_STORE")]
    pub store: PathBuf,

    /// Optional path to a YAML configuration file
    #[arg(short, long, env = "SITEMAP_WATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Process this many sites at once during `run-all` (overrides the config)
    #[arg(long)]
    pub site_concurrency: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Monitor every active site
    RunAll,
    /// Monitor a single site
    Run {
        /// Id of the site to monitor
        site_id: String,
    },
    /// Compare a site's live sitemap with its snapshot without recording anything
    Stats {
        /// Id of the site to inspect
        site_id: String,
    },
}
