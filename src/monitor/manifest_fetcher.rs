//! Sitemap retrieval with linear backoff.
//!
//! A sitemap that cannot be fetched is an expected outcome, not an
//! exceptional one, so [`ManifestFetcher::fetch`] returns `None` after the
//! last attempt instead of an error. The caller decides what that means for
//! the run.
//!
//! # Retry Strategy
//!
//! - 3 attempts in total by default
//! - The delay after failed attempt `n` (1-based) is `n * backoff_step`
//! - No delay after the final attempt

use crate::config::ManifestConfig;
use crate::http::HttpFetch;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

/// Fetches raw sitemap documents over an [`HttpFetch`] capability.
#[derive(Debug, Clone)]
pub struct ManifestFetcher<H> {
    http: H,
    user_agent: String,
    timeout: Duration,
    attempts: usize,
    backoff_step: Duration,
}

impl<H: HttpFetch> ManifestFetcher<H> {
    /// Create a sitemap fetcher.
    ///
    /// # Arguments
    ///
    /// * `http` - Outbound HTTP capability.
    /// * `config` - User-Agent, per-attempt timeout, attempt count and backoff
    ///   step. An attempt count of `0` is treated as `1`.
    pub fn new(http: H, config: &ManifestConfig) -> Self {
        Self {
            http,
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            attempts: config.attempts.max(1),
            backoff_step: config.backoff_step(),
        }
    }

    /// Fetch the document at `url`, retrying transient failures.
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute sitemap URL.
    ///
    /// # Returns
    ///
    /// The response body of the first successful attempt, or `None` once
    /// every attempt has failed.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch(&self, url: &str) -> Option<String> {
        let total_t0 = Instant::now();

        for attempt in 1..=self.attempts {
            match self.http.get_text(url, &self.user_agent, self.timeout).await {
                Ok(body) => return Some(body),
                Err(e) => {
                    warn!(
                        attempt,
                        max = self.attempts,
                        error = %e,
                        "Sitemap fetch attempt failed"
                    );
                    if attempt < self.attempts {
                        let delay = self.backoff_step.saturating_mul(attempt as u32);
                        sleep(delay).await;
                    }
                }
            }
        }

        error!(
            attempts = self.attempts,
            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
            "Sitemap fetch exhausted retries"
        );
        None
    }
}
