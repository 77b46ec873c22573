//! Bounded-concurrency page retrieval.
//!
//! Pages are fetched through an unordered `futures` buffer: at most
//! `max_concurrent` requests are in flight, and a finished request frees its
//! slot right away, so one slow page never holds back the rest of the batch.
//! Each result is written back at its input index, so the output still
//! follows input order. A failed page only nulls its own slot.

use crate::config::PageConfig;
use crate::http::HttpFetch;
use crate::models::FetchedPage;
use futures::stream::{self, StreamExt};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Fetches the HTML of newly discovered pages.
#[derive(Debug, Clone)]
pub struct PageFetcher<H> {
    http: H,
    user_agent: String,
    timeout: Duration,
    max_concurrent: usize,
}

impl<H: HttpFetch> PageFetcher<H> {
    /// Create a page fetcher.
    ///
    /// # Arguments
    ///
    /// * `http` - Outbound HTTP capability used for every page request.
    /// * `config` - User-Agent, per-request timeout and the in-flight limit.
    ///   A limit of `0` is treated as `1`.
    pub fn new(http: H, config: &PageConfig) -> Self {
        Self {
            http,
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            max_concurrent: config.max_concurrent.max(1),
        }
    }

    /// Fetch every URL concurrently.
    ///
    /// # Arguments
    ///
    /// * `urls` - Pages to download.
    ///
    /// # Returns
    ///
    /// One [`FetchedPage`] per input URL, in input order. Pages that could not
    /// be fetched carry `html: None`.
    #[instrument(level = "info", skip_all, fields(count = urls.len()))]
    pub async fn fetch_multiple(&self, urls: &[String]) -> Vec<FetchedPage> {
        let mut bodies: Vec<Option<String>> = vec![None; urls.len()];
        let mut completed = stream::iter(urls.iter().enumerate())
            .map(|(index, url)| async move { (index, self.fetch_single(url).await) })
            .buffer_unordered(self.max_concurrent);
        while let Some((index, html)) = completed.next().await {
            bodies[index] = html;
        }

        let pages: Vec<FetchedPage> = urls
            .iter()
            .cloned()
            .zip(bodies)
            .map(|(url, html)| FetchedPage { url, html })
            .collect();

        let fetched = pages.iter().filter(|p| p.html.is_some()).count();
        info!(
            requested = urls.len(),
            fetched,
            failed = urls.len() - fetched,
            "Fetched page batch"
        );
        pages
    }

    async fn fetch_single(&self, url: &str) -> Option<String> {
        match self.http.get_text(url, &self.user_agent, self.timeout).await {
            Ok(html) => {
                debug!(%url, bytes = html.len(), "Fetched page");
                Some(html)
            }
            Err(e) => {
                warn!(%url, error = %e, "Page fetch failed");
                None
            }
        }
    }
}
