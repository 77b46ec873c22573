//! # Sitemap Watch
//!
//! Watches a set of websites for newly published pages. Each run re-reads a
//! site's sitemap, diffs it against the last stored snapshot, fetches the
//! pages it has not seen before and records their title, description,
//! keywords and first heading as findings.
//!
//! ## Architecture
//!
//! 1. **Fetch**: Download the sitemap, retrying transient failures
//! 2. **Parse**: Read page URLs (or child sitemap URLs) from the XML
//! 3. **Diff**: Keep URLs missing from the stored snapshot
//! 4. **Fetch pages**: Download new pages, 20 at a time
//! 5. **Extract**: Pull metadata from each page and store findings
//! 6. **Record**: Replace the snapshot and write one run log
//!
//! The store and the HTTP client are injected through the
//! [`store::MonitorStore`] and [`http::HttpFetch`] traits.

pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod monitor;
pub mod store;
pub mod utils;

pub use config::MonitorConfig;
pub use error::{ConfigError, FetchError, MonitorError, StoreError};
pub use models::{RunResult, RunSummary, Site};
pub use monitor::MonitorOrchestrator;
