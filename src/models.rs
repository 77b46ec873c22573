//! Data models for monitored sites, findings and run logs.
//!
//! This module defines the records the monitoring pipeline reads and writes:
//! - [`Site`]: A monitored website and its last known URL snapshot
//! - [`Finding`]: One newly discovered page with its extracted metadata
//! - [`RunLog`]: The append-only record of a single monitoring run
//! - [`RunResult`] / [`RunSummary`]: What a run reports back to its caller
//!
//! Status enums serialize in `SCREAMING_SNAKE_CASE` to match the values
//! stored by the rest of the system (`ACTIVE`, `SUCCESS`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a monitored site.
///
/// Only [`SiteStatus::Active`] sites are picked up by a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SiteStatus {
    #[default]
    Active,
    Paused,
    Error,
    Pending,
}

/// A monitored website.
///
/// `last_urls` is the diff baseline for the next run. It is replaced as a
/// whole, together with `total_urls` and `last_check_time`, at the end of a
/// successful run and left untouched by a failed one.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Site {
    /// Store-assigned identity.
    pub id: String,
    /// Human readable label used to attribute log lines.
    pub name: String,
    /// Location of the site's sitemap (or sitemap index).
    pub manifest_url: String,
    #[serde(default)]
    pub status: SiteStatus,
    /// How often the site is meant to be checked, in hours.
    #[serde(default = "default_check_frequency")]
    pub check_frequency_hours: u32,
    /// The most recent successfully parsed manifest, in document order.
    #[serde(default)]
    pub last_urls: Vec<String>,
    /// Always `last_urls.len()` after a successful run.
    #[serde(default)]
    pub total_urls: usize,
    #[serde(default)]
    pub last_check_time: Option<DateTime<Utc>>,
}

fn default_check_frequency() -> u32 {
    24
}

impl Site {
    /// Create an active site with an empty snapshot.
    pub fn new(id: impl Into<String>, name: impl Into<String>, manifest_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            manifest_url: manifest_url.into(),
            status: SiteStatus::Active,
            check_frequency_hours: default_check_frequency(),
            last_urls: Vec::new(),
            total_urls: 0,
            last_check_time: None,
        }
    }
}

/// Metadata extracted from a single HTML page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub h1: String,
}

/// The outcome of fetching one page in a batch.
///
/// `html` is `None` when the fetch failed for any reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub html: Option<String>,
}

/// A finding waiting to be inserted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NewFinding {
    pub site_id: String,
    pub url: String,
    #[serde(flatten)]
    pub metadata: PageMetadata,
}

/// A newly discovered page, stored once per site and URL.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Finding {
    pub id: u64,
    pub site_id: String,
    pub url: String,
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub h1: String,
    #[serde(default)]
    pub is_read: bool,
    pub discovered_at: DateTime<Utc>,
}

/// Final status recorded for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Success,
    Failed,
    /// The run completed, but at least one new page could not be fetched.
    Partial,
}

/// A run log waiting to be inserted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NewRunLog {
    pub site_id: String,
    pub status: RunStatus,
    pub new_count: usize,
    pub error_message: Option<String>,
    pub duration_seconds: u64,
}

/// One record per monitoring run. Never updated after creation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RunLog {
    pub id: u64,
    pub site_id: String,
    pub status: RunStatus,
    pub new_count: usize,
    pub error_message: Option<String>,
    pub duration_seconds: u64,
    pub executed_at: DateTime<Utc>,
}

/// What `monitor_website` reports to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RunResult {
    pub site_id: String,
    pub success: bool,
    pub new_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub duration_seconds: u64,
}

/// Aggregate view over a batch of [`RunResult`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_new_findings: usize,
}

impl RunSummary {
    pub fn from_results(results: &[RunResult]) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            successful,
            failed: results.len() - successful,
            total_new_findings: results.iter().map(|r| r.new_count).sum(),
        }
    }
}

/// Counts comparing a fresh manifest to the stored snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct UrlStats {
    pub current_total: usize,
    pub last_total: usize,
    pub new_count: usize,
    pub removed_count: usize,
}
