//! Extract title, description, keywords and first heading from HTML.
//!
//! Extraction is a pure function of the markup. Titles go through a
//! [`TitleCleaner`], an ordered table of case-insensitive
//! `(pattern, replacement)` rules that strip the decorations sites append to
//! their page titles (`"- Play Online Free"`, `"| Poki"`, ...).

use crate::config::DEFAULT_TITLE_RULES;
use crate::error::ConfigError;
use crate::models::PageMetadata;
use crate::utils::truncate_chars;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use scraper::{Html, Selector};

/// Label used when a page has no usable title.
pub const NO_TITLE: &str = "No Title";

const MAX_DESCRIPTION_CHARS: usize = 500;
const MAX_KEYWORDS_CHARS: usize = 200;
const SYNTHESIZED_KEYWORD_WORDS: usize = 5;

static DEFAULT_CLEANER: Lazy<TitleCleaner> = Lazy::new(|| {
    TitleCleaner::new(DEFAULT_TITLE_RULES.iter().copied())
        .expect("built-in title rules are valid regexes")
});

/// Ordered title cleanup rules.
///
/// Rules are applied in table order, then the whole table is re-applied until
/// the title stops changing, so cleaning an already clean title is a no-op.
#[derive(Debug, Clone)]
pub struct TitleCleaner {
    rules: Vec<(Regex, String)>,
}

impl Default for TitleCleaner {
    fn default() -> Self {
        DEFAULT_CLEANER.clone()
    }
}

impl TitleCleaner {
    /// Compile a rule table. Patterns match case-insensitively.
    pub fn new<'a>(
        rules: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, ConfigError> {
        let rules = rules
            .into_iter()
            .map(|(pattern, replacement)| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|re| (re, replacement.to_string()))
                    .map_err(|source| ConfigError::TitleRule {
                        pattern: pattern.to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Strip known decorations from `title` and trim the result.
    ///
    /// The table is re-applied until the title stops changing. A pass that
    /// does not shrink the title ends the loop, so rules whose replacements
    /// grow or rewrite text in place cannot cycle forever.
    pub fn clean(&self, title: &str) -> String {
        let mut current = title.trim().to_string();
        loop {
            let mut next = current.clone();
            for (re, replacement) in &self.rules {
                next = re.replace_all(&next, replacement.as_str()).into_owned();
            }
            let next = next.trim().to_string();
            if next == current {
                return current;
            }
            let shrank = next.len() < current.len();
            current = next;
            if !shrank {
                return current;
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Selectors {
    title: Selector,
    h1: Selector,
    description: Selector,
    og_description: Selector,
    keywords: Selector,
}

impl Selectors {
    fn new() -> Self {
        Self {
            title: Selector::parse("title").unwrap(),
            h1: Selector::parse("h1").unwrap(),
            description: Selector::parse(r#"meta[name="description"]"#).unwrap(),
            og_description: Selector::parse(r#"meta[property="og:description"]"#).unwrap(),
            keywords: Selector::parse(r#"meta[name="keywords"]"#).unwrap(),
        }
    }
}

/// Turns page markup into [`PageMetadata`].
#[derive(Debug, Clone)]
pub struct MetadataExtractor {
    cleaner: TitleCleaner,
    selectors: Selectors,
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new(TitleCleaner::default())
    }
}

impl MetadataExtractor {
    /// Create an extractor that cleans titles with `cleaner`.
    pub fn new(cleaner: TitleCleaner) -> Self {
        Self {
            cleaner,
            selectors: Selectors::new(),
        }
    }

    /// Pull metadata out of `html`.
    ///
    /// # Returns
    ///
    /// A [`PageMetadata`] whose title is never empty (it falls back to
    /// [`NO_TITLE`]). Description and keywords are truncated, and keywords
    /// are synthesized from the title when the page declares none.
    pub fn extract(&self, html: &str) -> PageMetadata {
        let document = Html::parse_document(html);
        let sel = &self.selectors;

        let raw_title = first_text(&document, &sel.title);
        let cleaned = self.cleaner.clean(&raw_title);
        let title = if cleaned.is_empty() {
            NO_TITLE.to_string()
        } else {
            cleaned
        };

        let description = first_content(&document, &sel.description)
            .or_else(|| first_content(&document, &sel.og_description))
            .map(|d| truncate_chars(d.trim(), MAX_DESCRIPTION_CHARS))
            .unwrap_or_default();

        let keywords = match first_content(&document, &sel.keywords) {
            Some(keywords) => keywords,
            None if title != NO_TITLE => synthesize_keywords(&title),
            None => String::new(),
        };
        let keywords = truncate_chars(keywords.trim(), MAX_KEYWORDS_CHARS);

        let h1 = first_text(&document, &sel.h1);

        PageMetadata {
            title,
            description,
            keywords,
            h1,
        }
    }
}

/// Trimmed text of the first element matching `selector`, or `""`.
fn first_text(document: &Html, selector: &Selector) -> String {
    document
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// `content` of the first matching `<meta>`, if present and not blank.
fn first_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .filter(|content| !content.trim().is_empty())
        .map(str::to_string)
}

fn synthesize_keywords(title: &str) -> String {
    title
        .split_whitespace()
        .take(SYNTHESIZED_KEYWORD_WORDS)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str) -> PageMetadata {
        MetadataExtractor::default().extract(html)
    }

    #[test]
    fn test_clean_title_known_suffixes() {
        let cleaner = TitleCleaner::default();
        assert_eq!(cleaner.clean("Epic Jump Game - Play Online Free"), "Epic Jump Game");
        assert_eq!(cleaner.clean("Snake | Free Game for Kids"), "Snake");
        assert_eq!(cleaner.clean("Tetris - Poki"), "Tetris");
        assert_eq!(cleaner.clean("Tetris | crazygames  "), "Tetris");
        assert_eq!(cleaner.clean("Chess - PLAY FREE now"), "Chess");
        assert_eq!(cleaner.clean("Pokemon Cards"), "Pokemon Cards");
    }

    #[test]
    fn test_clean_title_is_idempotent() {
        let cleaner = TitleCleaner::default();
        let titles = [
            "Epic Jump Game - Play Online Free",
            "X - Poki - CrazyGames",
            "Game | Poki - Free Game",
            "  Plain title  ",
            "- Play Online",
            "",
        ];
        for title in titles {
            let once = cleaner.clean(title);
            assert_eq!(cleaner.clean(&once), once, "not idempotent for {title:?}");
        }
        assert_eq!(cleaner.clean("X - Poki - CrazyGames"), "X");
    }

    #[test]
    fn test_clean_title_strips_long_suffix_stacks() {
        let cleaner = TitleCleaner::default();
        for depth in [9, 10, 40] {
            let stacked = format!("X{}", " - Poki".repeat(depth));
            let once = cleaner.clean(&stacked);
            assert_eq!(once, "X", "depth {depth}");
            assert_eq!(cleaner.clean(&once), once);
        }

        let mixed = format!("Racer{}", " | CrazyGames - Poki".repeat(12));
        assert_eq!(cleaner.clean(&mixed), "Racer");
    }

    #[test]
    fn test_growing_rule_terminates() {
        let cleaner = TitleCleaner::new([(r"x$", "xx")]).unwrap();
        assert_eq!(cleaner.clean("x"), "xx");
    }

    #[test]
    fn test_missing_title_uses_fallback() {
        let meta = extract("<html><head></head><body><h1>Hello</h1></body></html>");
        assert_eq!(meta.title, NO_TITLE);
        assert_eq!(meta.keywords, "");
        assert_eq!(meta.h1, "Hello");
    }

    #[test]
    fn test_title_that_cleans_to_nothing_uses_fallback() {
        let meta = extract("<html><head><title> - Play Online Free </title></head></html>");
        assert_eq!(meta.title, NO_TITLE);
        assert_eq!(meta.keywords, "");
    }

    #[test]
    fn test_keywords_synthesized_from_clean_title() {
        let meta = extract(
            "<html><head><title>Epic Jump Game - Play Online Free</title></head><body></body></html>",
        );
        assert_eq!(meta.title, "Epic Jump Game");
        assert_eq!(meta.keywords, "Epic, Jump, Game");
    }

    #[test]
    fn test_synthesized_keywords_take_five_words() {
        let meta = extract("<title>One Two  Three Four Five Six Seven</title>");
        assert_eq!(meta.keywords, "One, Two, Three, Four, Five");
    }

    #[test]
    fn test_keywords_meta_wins() {
        let meta = extract(
            r#"<html><head><title>Epic Jump</title>
               <meta name="keywords" content="  platformer, jump  "></head></html>"#,
        );
        assert_eq!(meta.keywords, "platformer, jump");
    }

    #[test]
    fn test_blank_keywords_meta_falls_back_to_title() {
        let meta = extract(r#"<title>Epic Jump</title><meta name="keywords" content="  ">"#);
        assert_eq!(meta.keywords, "Epic, Jump");
    }

    #[test]
    fn test_description_prefers_meta_then_og() {
        let both = extract(
            r#"<head><meta name="description" content=" Main "><meta property="og:description" content="OG"></head>"#,
        );
        assert_eq!(both.description, "Main");

        let og_only = extract(
            r#"<head><meta name="description" content=""><meta property="og:description" content=" OG text "></head>"#,
        );
        assert_eq!(og_only.description, "OG text");

        assert_eq!(extract("<head></head>").description, "");
    }

    #[test]
    fn test_lengths_are_truncated() {
        let long = "é".repeat(800);
        let html = format!(
            r#"<head><meta name="description" content="{long}"><meta name="keywords" content="{long}"></head>"#
        );
        let meta = extract(&html);
        assert_eq!(meta.description.chars().count(), 500);
        assert_eq!(meta.keywords.chars().count(), 200);
    }

    #[test]
    fn test_first_h1_only() {
        let meta = extract("<body><h1>  First <em>Heading</em> </h1><h1>Second</h1></body>");
        assert_eq!(meta.h1, "First Heading");
    }

    #[test]
    fn test_custom_rule_table() {
        let cleaner = TitleCleaner::new([(r"\s*::\s*Arcade Hub$", "")]).unwrap();
        let extractor = MetadataExtractor::new(cleaner);
        let meta = extractor.extract("<title>Pong :: ARCADE HUB</title>");
        assert_eq!(meta.title, "Pong");
    }
}
