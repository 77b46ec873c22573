//! Error types for the monitoring pipeline.
//!
//! - [`FetchError`]: a single outbound HTTP request failed
//! - [`StoreError`]: the persistence store rejected a read or write
//! - [`MonitorError`]: anything that ends a site's run as `FAILED`
//! - [`ConfigError`]: the configuration file could not be used

use thiserror::Error;

/// Errors returned by an [`HttpFetch`](crate::http::HttpFetch) implementation.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("Timeout fetching {0}")]
    Timeout(String),
}

/// Errors returned by a [`MonitorStore`](crate::store::MonitorStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store data is corrupt: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("site not found in store: {0}")]
    UnknownSite(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Fatal conditions for a single site's run.
///
/// The display string is what ends up in the `FAILED` run log.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Website not found")]
    SiteNotFound,
    #[error("Invalid sitemap URL {url}: {reason}")]
    InvalidManifestUrl { url: String, reason: String },
    #[error("Failed to fetch sitemap")]
    ManifestUnavailable,
    #[error("Malformed sitemap: {0}")]
    MalformedManifest(String),
    #[error("No URLs found in sitemap")]
    EmptyManifest,
    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

/// Errors raised while loading [`MonitorConfig`](crate::config::MonitorConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid title rule pattern {pattern:?}: {source}")]
    TitleRule {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
