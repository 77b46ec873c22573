//! Diff a fresh sitemap against the stored snapshot.

use crate::models::UrlStats;
use std::collections::HashSet;

/// Default cap on new URLs returned per comparison.
pub const DEFAULT_MAX_NEW_URLS: usize = 50;

/// Finds URLs present now but absent from the previous snapshot.
#[derive(Debug, Clone, Copy)]
pub struct UrlComparator {
    max_new_urls: usize,
}

impl Default for UrlComparator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NEW_URLS)
    }
}

impl UrlComparator {
    /// Create a comparator.
    ///
    /// # Arguments
    ///
    /// * `max_new_urls` - Cap applied by [`new_urls`](Self::new_urls) and to
    ///   `new_count` in [`stats`](Self::stats).
    pub fn new(max_new_urls: usize) -> Self {
        Self { max_new_urls }
    }

    /// Entries of `current` not in `previous`, in `current`'s order, at most `cap`.
    pub fn find_new_urls(&self, current: &[String], previous: &[String], cap: usize) -> Vec<String> {
        let seen: HashSet<&str> = previous.iter().map(String::as_str).collect();
        current
            .iter()
            .filter(|url| !seen.contains(url.as_str()))
            .take(cap)
            .cloned()
            .collect()
    }

    /// [`find_new_urls`](Self::find_new_urls) with the configured cap.
    pub fn new_urls(&self, current: &[String], previous: &[String]) -> Vec<String> {
        self.find_new_urls(current, previous, self.max_new_urls)
    }

    /// Summary counts for a comparison.
    ///
    /// `new_count` is capped like [`new_urls`](Self::new_urls), so it matches
    /// what a run would actually process. `removed_count` is the full number
    /// of snapshot URLs missing from `current`.
    pub fn stats(&self, current: &[String], previous: &[String]) -> UrlStats {
        UrlStats {
            current_total: current.len(),
            last_total: previous.len(),
            new_count: self.new_urls(current, previous).len(),
            removed_count: self.find_new_urls(previous, current, usize::MAX).len(),
        }
    }
}
