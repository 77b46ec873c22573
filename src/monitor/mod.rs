//! The sitemap monitoring pipeline.
//!
//! Each submodule is one step of a run, composed by the orchestrator:
//!
//! | Step | Module | Notes |
//! |------|--------|-------|
//! | Fetch sitemap | [`manifest_fetcher`] | 3 attempts, linear backoff |
//! | Parse sitemap | [`manifest_parser`] | `<urlset>` and `<sitemapindex>` |
//! | Diff | [`url_comparator`] | order-preserving, capped |
//! | Fetch pages | [`page_fetcher`] | 20 in flight, input order kept |
//! | Extract | [`metadata_extractor`] | title cleanup rule table |
//! | Orchestrate | [`orchestrator`] | one run log per run |

pub mod manifest_fetcher;
pub mod manifest_parser;
pub mod metadata_extractor;
pub mod orchestrator;
pub mod page_fetcher;
pub mod url_comparator;

pub use manifest_fetcher::ManifestFetcher;
pub use manifest_parser::{Manifest, ManifestKind, ManifestParser};
pub use metadata_extractor::{MetadataExtractor, TitleCleaner};
pub use orchestrator::MonitorOrchestrator;
pub use page_fetcher::PageFetcher;
pub use url_comparator::UrlComparator;
