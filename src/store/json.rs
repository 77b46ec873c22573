//! JSON-file backed [`MonitorStore`].
//!
//! The whole state lives in memory behind a mutex. When the store was opened
//! from a path, every mutation is written back as pretty JSON through a
//! temporary file and a rename, so a crash never leaves a half-written file.
//!
//! # File Layout
//!
//! ```json
//! {
//!   "sites": [ { "id": "s1", "name": "...", "manifest_url": "...", ... } ],
//!   "findings": [ ... ],
//!   "run_logs": [ ... ]
//! }
//! ```

use super::MonitorStore;
use crate::error::StoreError;
use crate::models::{Finding, NewFinding, NewRunLog, RunLog, Site, SiteStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// Everything the store holds.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StoreState {
    #[serde(default)]
    pub sites: Vec<Site>,
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub run_logs: Vec<RunLog>,
}

/// A [`MonitorStore`] kept in memory and optionally mirrored to a JSON file.
#[derive(Debug)]
pub struct JsonStore {
    path: Option<PathBuf>,
    state: Mutex<StoreState>,
}

impl JsonStore {
    /// A store that never touches the file system.
    pub fn in_memory(state: StoreState) -> Self {
        Self {
            path: None,
            state: Mutex::new(state),
        }
    }

    /// Open the store at `path`. A missing file is an empty store.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let state = match fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("Store file does not exist yet; starting empty");
                StoreState::default()
            }
            Err(e) => return Err(e.into()),
        };
        info!(
            sites = state.sites.len(),
            findings = state.findings.len(),
            run_logs = state.run_logs.len(),
            "Opened store"
        );
        Ok(Self {
            path: Some(path),
            state: Mutex::new(state),
        })
    }

    /// A copy of the current state.
    pub async fn snapshot(&self) -> StoreState {
        self.state.lock().await.clone()
    }

    /// Apply `change` to a copy of the state, persist it, then commit.
    ///
    /// If persisting fails the in-memory state is left as it was.
    async fn mutate<R>(
        &self,
        change: impl FnOnce(&mut StoreState) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();
        let out = change(&mut next)?;
        if let Some(path) = &self.path {
            write_atomically(path, &next).await?;
        }
        *guard = next;
        Ok(out)
    }
}

async fn write_atomically(path: &Path, state: &StoreState) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(state)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, json).await?;
    fs::rename(&tmp, path).await?;
    debug!(path = %path.display(), "Persisted store");
    Ok(())
}

impl MonitorStore for JsonStore {
    async fn get_site(&self, site_id: &str) -> Result<Option<Site>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.sites.iter().find(|s| s.id == site_id).cloned())
    }

    async fn active_sites(&self) -> Result<Vec<Site>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .sites
            .iter()
            .filter(|s| s.status == SiteStatus::Active)
            .cloned()
            .collect())
    }

    async fn update_snapshot(
        &self,
        site_id: &str,
        urls: &[String],
        checked_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.mutate(|state| {
            let site = state
                .sites
                .iter_mut()
                .find(|s| s.id == site_id)
                .ok_or_else(|| StoreError::UnknownSite(site_id.to_string()))?;
            site.last_urls = urls.to_vec();
            site.total_urls = urls.len();
            site.last_check_time = Some(checked_at);
            Ok(())
        })
        .await
    }

    async fn insert_findings(&self, findings: Vec<NewFinding>) -> Result<usize, StoreError> {
        if findings.is_empty() {
            return Ok(0);
        }
        self.mutate(|state| {
            let mut seen: HashSet<(String, String)> = state
                .findings
                .iter()
                .map(|f| (f.site_id.clone(), f.url.clone()))
                .collect();
            let mut next_id = state.findings.iter().map(|f| f.id).max().unwrap_or(0) + 1;
            let now = Utc::now();
            let mut inserted = 0;

            for finding in findings {
                if !seen.insert((finding.site_id.clone(), finding.url.clone())) {
                    continue;
                }
                state.findings.push(Finding {
                    id: next_id,
                    site_id: finding.site_id,
                    url: finding.url,
                    title: finding.metadata.title,
                    description: finding.metadata.description,
                    keywords: finding.metadata.keywords,
                    h1: finding.metadata.h1,
                    is_read: false,
                    discovered_at: now,
                });
                next_id += 1;
                inserted += 1;
            }
            Ok(inserted)
        })
        .await
    }

    async fn insert_run_log(&self, log: NewRunLog) -> Result<RunLog, StoreError> {
        self.mutate(|state| {
            let id = state.run_logs.iter().map(|l| l.id).max().unwrap_or(0) + 1;
            let record = RunLog {
                id,
                site_id: log.site_id,
                status: log.status,
                new_count: log.new_count,
                error_message: log.error_message,
                duration_seconds: log.duration_seconds,
                executed_at: Utc::now(),
            };
            state.run_logs.push(record.clone());
            Ok(record)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PageMetadata, RunStatus};

    fn finding(site_id: &str, url: &str) -> NewFinding {
        NewFinding {
            site_id: site_id.to_string(),
            url: url.to_string(),
            metadata: PageMetadata {
                title: "T".to_string(),
                ..PageMetadata::default()
            },
        }
    }

    fn seeded() -> StoreState {
        let mut paused = Site::new("s2", "Paused", "https://paused.example/sitemap.xml");
        paused.status = SiteStatus::Paused;
        StoreState {
            sites: vec![
                Site::new("s1", "Active", "https://active.example/sitemap.xml"),
                paused,
                Site::new("s3", "Also active", "https://other.example/sitemap.xml"),
            ],
            ..StoreState::default()
        }
    }

    #[tokio::test]
    async fn test_active_sites_filters_and_keeps_order() {
        let store = JsonStore::in_memory(seeded());
        let ids: Vec<String> = store.active_sites().await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["s1", "s3"]);
        assert!(store.get_site("s2").await.unwrap().is_some());
        assert!(store.get_site("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_findings_are_skipped() {
        let store = JsonStore::in_memory(seeded());
        let first = store
            .insert_findings(vec![finding("s1", "https://a/1"), finding("s1", "https://a/2")])
            .await
            .unwrap();
        assert_eq!(first, 2);

        let second = store
            .insert_findings(vec![
                finding("s1", "https://a/2"),
                finding("s3", "https://a/2"),
                finding("s1", "https://a/3"),
                finding("s1", "https://a/3"),
            ])
            .await
            .unwrap();
        assert_eq!(second, 2);

        let state = store.snapshot().await;
        assert_eq!(state.findings.len(), 4);
        let ids: Vec<u64> = state.findings.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert!(state.findings.iter().all(|f| !f.is_read));
    }

    #[tokio::test]
    async fn test_update_snapshot_keeps_count_consistent() {
        let store = JsonStore::in_memory(seeded());
        let urls = vec!["https://a/1".to_string(), "https://a/2".to_string()];
        let now = Utc::now();
        store.update_snapshot("s1", &urls, now).await.unwrap();

        let site = store.get_site("s1").await.unwrap().unwrap();
        assert_eq!(site.last_urls, urls);
        assert_eq!(site.total_urls, 2);
        assert_eq!(site.last_check_time, Some(now));

        assert!(matches!(
            store.update_snapshot("missing", &urls, now).await,
            Err(StoreError::UnknownSite(_))
        ));
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("store.json");

        let store = JsonStore::open(&path).await.unwrap();
        assert_eq!(store.snapshot().await, StoreState::default());
        assert!(!path.exists());

        let store = JsonStore::in_memory(seeded());
        let store = JsonStore {
            path: Some(path.clone()),
            ..store
        };
        store.insert_findings(vec![finding("s1", "https://a/1")]).await.unwrap();
        store
            .insert_run_log(NewRunLog {
                site_id: "s1".to_string(),
                status: RunStatus::Success,
                new_count: 1,
                error_message: None,
                duration_seconds: 2,
            })
            .await
            .unwrap();

        let reopened = JsonStore::open(&path).await.unwrap();
        let state = reopened.snapshot().await;
        assert_eq!(state.sites.len(), 3);
        assert_eq!(state.findings.len(), 1);
        assert_eq!(state.run_logs.len(), 1);
        assert_eq!(state.run_logs[0].status, RunStatus::Success);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("store.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(JsonStore::open(&path).await, Err(StoreError::Serde(_))));
    }
}
