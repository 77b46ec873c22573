//! Persistence for sites, findings and run logs.
//!
//! The pipeline only sees the [`MonitorStore`] trait. Each method is a short,
//! independent operation; nothing is held across calls and there is no
//! transaction spanning the finding inserts and the snapshot update.
//!
//! # Submodules
//!
//! - [`json`]: [`JsonStore`], an in-memory store optionally persisted to a
//!   JSON file

pub mod json;

pub use json::{JsonStore, StoreState};

use crate::error::StoreError;
use crate::models::{NewFinding, NewRunLog, RunLog, Site};
use chrono::{DateTime, Utc};

/// Storage capability consumed by the monitor.
pub trait MonitorStore {
    async fn get_site(&self, site_id: &str) -> Result<Option<Site>, StoreError>;

    /// All sites with status `ACTIVE`, in store order.
    async fn active_sites(&self) -> Result<Vec<Site>, StoreError>;

    /// Replace a site's snapshot: `last_urls`, `total_urls` and `last_check_time`.
    async fn update_snapshot(
        &self,
        site_id: &str,
        urls: &[String],
        checked_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Insert findings, silently skipping any `(site_id, url)` already stored.
    ///
    /// Returns the number of rows actually inserted.
    async fn insert_findings(&self, findings: Vec<NewFinding>) -> Result<usize, StoreError>;

    async fn insert_run_log(&self, log: NewRunLog) -> Result<RunLog, StoreError>;
}

impl<T: MonitorStore + ?Sized> MonitorStore for &T {
    async fn get_site(&self, site_id: &str) -> Result<Option<Site>, StoreError> {
        (**self).get_site(site_id).await
    }

    async fn active_sites(&self) -> Result<Vec<Site>, StoreError> {
        (**self).active_sites().await
    }

    async fn update_snapshot(
        &self,
        site_id: &str,
        urls: &[String],
        checked_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        (**self).update_snapshot(site_id, urls, checked_at).await
    }

    async fn insert_findings(&self, findings: Vec<NewFinding>) -> Result<usize, StoreError> {
        (**self).insert_findings(findings).await
    }

    async fn insert_run_log(&self, log: NewRunLog) -> Result<RunLog, StoreError> {
        (**self).insert_run_log(log).await
    }
}
