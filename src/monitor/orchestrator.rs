//! Per-site monitoring runs and the all-sites batch.
//!
//! A run walks a fixed sequence of steps:
//!
//! ```text
//! FETCH_MANIFEST -> PARSE -> DIFF -> FETCH_PAGES -> EXTRACT_AND_PERSIST -> UPDATE_SNAPSHOT -> LOG
//! ```
//!
//! `FETCH_PAGES` and `EXTRACT_AND_PERSIST` are skipped when nothing is new.
//! Any error before `UPDATE_SNAPSHOT` skips straight to a `FAILED` log and
//! leaves the snapshot as it was. Every call to
//! [`MonitorOrchestrator::monitor_website`] writes exactly one run log.

use crate::config::MonitorConfig;
use crate::error::{ConfigError, MonitorError};
use crate::http::HttpFetch;
use crate::models::{NewFinding, NewRunLog, RunResult, RunStatus, RunSummary, Site, UrlStats};
use crate::monitor::manifest_fetcher::ManifestFetcher;
use crate::monitor::manifest_parser::{ManifestKind, ManifestParser};
use crate::monitor::metadata_extractor::MetadataExtractor;
use crate::monitor::page_fetcher::PageFetcher;
use crate::monitor::url_comparator::UrlComparator;
use crate::store::MonitorStore;
use crate::utils::truncate_for_log;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Drives monitoring runs over injected collaborators.
///
/// `S` is the persistence store and `H` the outbound HTTP capability. Both
/// fetchers share the same `H`.
#[derive(Debug)]
pub struct MonitorOrchestrator<S, H> {
    store: S,
    manifest_fetcher: ManifestFetcher<H>,
    parser: ManifestParser,
    comparator: UrlComparator,
    page_fetcher: PageFetcher<H>,
    extractor: MetadataExtractor,
    site_concurrency: usize,
}

impl<S, H> MonitorOrchestrator<S, H>
where
    S: MonitorStore,
    H: HttpFetch + Clone,
{
    /// Build every collaborator from `config` around one HTTP capability.
    ///
    /// # Arguments
    ///
    /// * `store` - Persistence for sites, findings and run logs.
    /// * `http` - Shared by the sitemap and page fetchers.
    /// * `config` - Fetch settings, new-URL cap, site concurrency and title
    ///   rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TitleRule`] when a configured title rule is not
    /// a valid regex.
    pub fn from_config(store: S, http: H, config: &MonitorConfig) -> Result<Self, ConfigError> {
        let extractor = MetadataExtractor::new(config.title_cleaner()?);
        Ok(Self::new(
            store,
            ManifestFetcher::new(http.clone(), &config.manifest),
            ManifestParser,
            UrlComparator::new(config.max_new_urls),
            PageFetcher::new(http, &config.pages),
            extractor,
        )
        .with_site_concurrency(config.site_concurrency))
    }
}

impl<S, H> MonitorOrchestrator<S, H>
where
    S: MonitorStore,
    H: HttpFetch,
{
    /// Assemble an orchestrator from ready-made collaborators.
    ///
    /// Sites are processed one at a time until
    /// [`with_site_concurrency`](Self::with_site_concurrency) says otherwise.
    pub fn new(
        store: S,
        manifest_fetcher: ManifestFetcher<H>,
        parser: ManifestParser,
        comparator: UrlComparator,
        page_fetcher: PageFetcher<H>,
        extractor: MetadataExtractor,
    ) -> Self {
        Self {
            store,
            manifest_fetcher,
            parser,
            comparator,
            page_fetcher,
            extractor,
            site_concurrency: 1,
        }
    }

    /// Number of sites a batch processes at once. `1` (the default) is
    /// strictly sequential.
    pub fn with_site_concurrency(mut self, site_concurrency: usize) -> Self {
        self.site_concurrency = site_concurrency.max(1);
        self
    }

    /// Run the full pipeline for one site.
    ///
    /// Never fails: every error is recorded as a `FAILED` run log and
    /// reported through the returned [`RunResult`].
    #[instrument(level = "info", skip(self))]
    pub async fn monitor_website(&self, site_id: &str) -> RunResult {
        let t0 = Instant::now();

        match self.run_site(site_id, t0).await {
            Ok(result) => result,
            Err(e) => {
                let duration_seconds = t0.elapsed().as_secs();
                let error_message = e.to_string();
                error!(error = %e, duration_seconds, "Monitoring failed");

                let log = NewRunLog {
                    site_id: site_id.to_string(),
                    status: RunStatus::Failed,
                    new_count: 0,
                    error_message: Some(error_message.clone()),
                    duration_seconds,
                };
                if let Err(log_err) = self.store.insert_run_log(log).await {
                    error!(error = %log_err, "Failed to record failed run");
                }

                RunResult {
                    site_id: site_id.to_string(),
                    success: false,
                    new_count: 0,
                    error_message: Some(error_message),
                    duration_seconds,
                }
            }
        }
    }

    /// Run every `ACTIVE` site and return one result per site, in store order.
    ///
    /// A failing site never stops the batch. The only error is failing to
    /// load the site list.
    #[instrument(level = "info", skip(self))]
    pub async fn monitor_all_websites(&self) -> Result<Vec<RunResult>, MonitorError> {
        let sites = self.store.active_sites().await?;
        info!(
            count = sites.len(),
            site_concurrency = self.site_concurrency,
            "Starting monitoring for all active sites"
        );

        // With a limit of 1 the next site only starts once the previous run
        // has finished. Results land at their site's index.
        let mut slots: Vec<Option<RunResult>> = vec![None; sites.len()];
        let mut completed = stream::iter(sites.iter().enumerate())
            .map(|(index, site)| async move { (index, self.monitor_website(&site.id).await) })
            .buffer_unordered(self.site_concurrency);
        while let Some((index, result)) = completed.next().await {
            slots[index] = Some(result);
        }
        let results: Vec<RunResult> = slots.into_iter().flatten().collect();

        let summary = RunSummary::from_results(&results);
        info!(
            total = summary.total,
            successful = summary.successful,
            failed = summary.failed,
            total_new_findings = summary.total_new_findings,
            "Monitoring batch completed"
        );
        Ok(results)
    }

    /// Fetch and diff a site's sitemap without writing anything.
    #[instrument(level = "info", skip(self))]
    pub async fn preview(&self, site_id: &str) -> Result<UrlStats, MonitorError> {
        let site = self.load_site(site_id).await?;
        let current = self.fetch_manifest(&site).await?;
        Ok(self.comparator.stats(&current, &site.last_urls))
    }

    async fn run_site(&self, site_id: &str, t0: Instant) -> Result<RunResult, MonitorError> {
        let site = self.load_site(site_id).await?;
        let current = self.fetch_manifest(&site).await?;

        let new_urls = self.comparator.new_urls(&current, &site.last_urls);
        let stats = self.comparator.stats(&current, &site.last_urls);
        info!(
            site = %site.name,
            new = new_urls.len(),
            current_total = stats.current_total,
            last_total = stats.last_total,
            removed = stats.removed_count,
            "Compared sitemap with snapshot"
        );

        let mut failed_pages = 0;
        if !new_urls.is_empty() {
            info!(site = %site.name, "Fetching metadata");
            let pages = self.page_fetcher.fetch_multiple(&new_urls).await;
            failed_pages = pages.iter().filter(|p| p.html.is_none()).count();

            let findings: Vec<NewFinding> = pages
                .into_iter()
                .filter_map(|page| {
                    let html = page.html?;
                    Some(NewFinding {
                        site_id: site.id.clone(),
                        url: page.url,
                        metadata: self.extractor.extract(&html),
                    })
                })
                .collect();

            if !findings.is_empty() {
                let offered = findings.len();
                let inserted = self.store.insert_findings(findings).await?;
                info!(site = %site.name, offered, inserted, "Saved findings");
            }
        }

        self.store
            .update_snapshot(&site.id, &current, Utc::now())
            .await?;

        let (status, note) = if failed_pages > 0 {
            (
                RunStatus::Partial,
                Some(format!(
                    "{failed_pages} of {} new pages could not be fetched",
                    new_urls.len()
                )),
            )
        } else {
            (RunStatus::Success, None)
        };

        let duration_seconds = t0.elapsed().as_secs();
        self.store
            .insert_run_log(NewRunLog {
                site_id: site.id.clone(),
                status,
                new_count: new_urls.len(),
                error_message: note,
                duration_seconds,
            })
            .await?;

        info!(site = %site.name, ?status, duration_seconds, "Monitoring completed");
        Ok(RunResult {
            site_id: site.id,
            success: true,
            new_count: new_urls.len(),
            error_message: None,
            duration_seconds,
        })
    }

    async fn load_site(&self, site_id: &str) -> Result<Site, MonitorError> {
        self.store
            .get_site(site_id)
            .await?
            .ok_or(MonitorError::SiteNotFound)
    }

    /// Validate, fetch and parse a site's sitemap. An empty sitemap is an error.
    async fn fetch_manifest(&self, site: &Site) -> Result<Vec<String>, MonitorError> {
        Url::parse(&site.manifest_url).map_err(|e| MonitorError::InvalidManifestUrl {
            url: site.manifest_url.clone(),
            reason: e.to_string(),
        })?;

        info!(site = %site.name, url = %site.manifest_url, "Fetching sitemap");
        let xml = self
            .manifest_fetcher
            .fetch(&site.manifest_url)
            .await
            .ok_or(MonitorError::ManifestUnavailable)?;

        info!(site = %site.name, "Parsing sitemap");
        let manifest = self.parser.parse(&xml).inspect_err(|_| {
            debug!(preview = %truncate_for_log(&xml, 300), "Unparseable sitemap body");
        })?;

        if manifest.kind == ManifestKind::Index {
            warn!(
                site = %site.name,
                children = manifest.urls.len(),
                "Sitemap is an index; child sitemap URLs are treated as pages"
            );
        }
        if manifest.urls.is_empty() {
            return Err(MonitorError::EmptyManifest);
        }
        Ok(manifest.urls)
    }
}
