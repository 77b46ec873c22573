//! Runtime configuration loaded from an optional YAML file.
//!
//! Every field has a default, so an empty file (or no file at all) yields the
//! stock behavior: three manifest attempts with linear backoff, twenty
//! concurrent page fetches, a cap of fifty new URLs per run and strictly
//! sequential site processing.
//!
//! # Example
//!
//! ```yaml
//! manifest:
//!   attempts: 5
//! pages:
//!   max_concurrent: 8
//! site_concurrency: 2
//! title_rules:
//!   - pattern: '\s*[-|]\s*My Portal\s*$'
//!     replacement: ''
//! ```

use crate::error::ConfigError;
use crate::monitor::metadata_extractor::TitleCleaner;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

/// Title decorations stripped by default, applied in this order.
pub const DEFAULT_TITLE_RULES: &[(&str, &str)] = &[
    (r"\s*[-|]\s*Play\s+Online.*$", ""),
    (r"\s*[-|]\s*Free\s+Game.*$", ""),
    (r"\s*[-|]\s*Poki\s*$", ""),
    (r"\s*[-|]\s*CrazyGames\s*$", ""),
    (r"\s*[-|]\s*Play\s+Free.*$", ""),
];

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub manifest: ManifestConfig,
    pub pages: PageConfig,
    /// Maximum number of new URLs processed per run.
    pub max_new_urls: usize,
    /// Number of sites processed at once by a batch run. `1` is sequential.
    pub site_concurrency: usize,
    /// Ordered, case-insensitive `(pattern, replacement)` title cleanup table.
    pub title_rules: Vec<TitleRule>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            manifest: ManifestConfig::default(),
            pages: PageConfig::default(),
            max_new_urls: 50,
            site_concurrency: 1,
            title_rules: DEFAULT_TITLE_RULES
                .iter()
                .map(|(pattern, replacement)| TitleRule {
                    pattern: (*pattern).to_string(),
                    replacement: (*replacement).to_string(),
                })
                .collect(),
        }
    }
}

/// Settings for sitemap retrieval.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ManifestConfig {
    pub timeout_secs: u64,
    /// Total attempts, including the first one.
    pub attempts: usize,
    /// Delay unit between attempts; attempt `n` waits `n * backoff_step_ms`.
    pub backoff_step_ms: u64,
    pub user_agent: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            attempts: 3,
            backoff_step_ms: 1000,
            user_agent: "Mozilla/5.0 (compatible; SitemapMonitor/1.0)".to_string(),
        }
    }
}

impl ManifestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff_step(&self) -> Duration {
        Duration::from_millis(self.backoff_step_ms)
    }
}

/// Settings for page retrieval.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PageConfig {
    pub timeout_secs: u64,
    pub max_concurrent: usize,
    pub user_agent: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_concurrent: 20,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
        }
    }
}

impl PageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// One entry of the title cleanup table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TitleRule {
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
}

impl MonitorConfig {
    /// Parse a configuration from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load a configuration file, or the defaults when `path` is `None`.
    ///
    /// The title rule table is compiled once here so a bad pattern is
    /// reported at startup rather than on the first page.
    #[instrument(level = "info", skip_all)]
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let text = tokio::fs::read_to_string(path).await?;
                info!(path = %path.display(), "Loaded configuration");
                Self::from_yaml(&text)?
            }
            None => {
                info!("No config file given; using defaults");
                Self::default()
            }
        };
        config.title_cleaner()?;
        Ok(config)
    }

    /// Compile the title rule table.
    pub fn title_cleaner(&self) -> Result<TitleCleaner, ConfigError> {
        TitleCleaner::new(
            self.title_rules
                .iter()
                .map(|rule| (rule.pattern.as_str(), rule.replacement.as_str())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.manifest.attempts, 3);
        assert_eq!(config.manifest.timeout(), Duration::from_secs(30));
        assert_eq!(config.manifest.backoff_step(), Duration::from_secs(1));
        assert_eq!(config.pages.max_concurrent, 20);
        assert_eq!(config.max_new_urls, 50);
        assert_eq!(config.site_concurrency, 1);
        assert_eq!(config.title_rules.len(), DEFAULT_TITLE_RULES.len());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(MonitorConfig::from_yaml("").unwrap(), MonitorConfig::default());
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = "manifest:\n  attempts: 5\npages:\n  max_concurrent: 4\nsite_concurrency: 2\n";
        let config = MonitorConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.manifest.attempts, 5);
        assert_eq!(config.manifest.timeout_secs, 30);
        assert_eq!(config.pages.max_concurrent, 4);
        assert_eq!(config.site_concurrency, 2);
        assert_eq!(config.max_new_urls, 50);
    }

    #[test]
    fn test_custom_title_rules_replace_table() {
        let yaml = "title_rules:\n  - pattern: '\\s*\\|\\s*My Portal$'\n";
        let config = MonitorConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.title_rules.len(), 1);
        assert_eq!(config.title_rules[0].replacement, "");
        let cleaner = config.title_cleaner().unwrap();
        assert_eq!(cleaner.clean("Space Race | my portal"), "Space Race");
    }

    #[test]
    fn test_bad_title_rule_is_rejected() {
        let yaml = "title_rules:\n  - pattern: '(unclosed'\n";
        let config = MonitorConfig::from_yaml(yaml).unwrap();
        assert!(matches!(
            config.title_cleaner(),
            Err(ConfigError::TitleRule { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_without_path() {
        let config = MonitorConfig::load(None).await.unwrap();
        assert_eq!(config, MonitorConfig::default());
    }
}
