//! Parse sitemap and sitemap index documents.
//!
//! Two shapes are recognised by their root element:
//!
//! | Root | Entries | Returned URLs |
//! |------|---------|---------------|
//! | `<urlset>` | `<url><loc>` | page URLs, in document order |
//! | `<sitemapindex>` | `<sitemap><loc>` | child sitemap URLs, unflattened |
//!
//! Child sitemaps of an index are not fetched. A site whose sitemap is an
//! index reports the child sitemap URLs themselves as its pages.

use crate::error::MonitorError;
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, instrument};

/// Which document shape a sitemap turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    UrlSet,
    Index,
}

impl ManifestKind {
    fn entry_tag(self) -> &'static [u8] {
        match self {
            ManifestKind::UrlSet => b"url",
            ManifestKind::Index => b"sitemap",
        }
    }
}

/// A parsed sitemap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub kind: ManifestKind,
    pub urls: Vec<String>,
}

/// Stateless sitemap parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestParser;

impl ManifestParser {
    /// Parse `xml` into its list of `<loc>` values.
    ///
    /// An unknown root element, ill-formed or truncated XML, and entries
    /// without a `<loc>` are all [`MonitorError::MalformedManifest`]. A well
    /// formed document with no entries parses to an empty list.
    #[instrument(level = "debug", skip_all, fields(bytes = xml.len()))]
    pub fn parse(&self, xml: &str) -> Result<Manifest, MonitorError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut kind: Option<ManifestKind> = None;
        let mut root_closed = false;
        let mut depth = 0usize;
        let mut in_entry = false;
        let mut in_loc = false;
        let mut loc_text = String::new();
        let mut current_loc: Option<String> = None;
        let mut urls = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = e.local_name();
                    let name = name.as_ref();
                    match kind {
                        None => kind = Some(root_kind(name)?),
                        Some(_) if root_closed => {
                            return Err(malformed("multiple root elements"));
                        }
                        Some(k) => {
                            if depth == 1 && name == k.entry_tag() {
                                in_entry = true;
                                current_loc = None;
                            } else if in_entry && depth == 2 && name == b"loc" {
                                in_loc = true;
                                loc_text.clear();
                            }
                        }
                    }
                    depth += 1;
                }
                Ok(Event::Empty(e)) => {
                    let name = e.local_name();
                    let name = name.as_ref();
                    match kind {
                        None => {
                            kind = Some(root_kind(name)?);
                            root_closed = true;
                        }
                        Some(_) if root_closed => {
                            return Err(malformed("multiple root elements"));
                        }
                        Some(k) => {
                            if depth == 1 && name == k.entry_tag() {
                                return Err(malformed("entry without <loc>"));
                            } else if in_entry && depth == 2 && name == b"loc" {
                                current_loc = Some(String::new());
                            }
                        }
                    }
                }
                Ok(Event::Text(e)) => {
                    if in_loc {
                        let text = e
                            .unescape()
                            .map_err(|e| malformed(format!("bad <loc> text: {e}")))?;
                        loc_text.push_str(&text);
                    }
                }
                Ok(Event::CData(e)) => {
                    if in_loc {
                        loc_text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                    }
                }
                Ok(Event::End(e)) => {
                    depth = depth.saturating_sub(1);
                    let name = e.local_name();
                    let name = name.as_ref();
                    if in_loc && name == b"loc" {
                        in_loc = false;
                        current_loc = Some(loc_text.trim().to_string());
                    } else if in_entry && depth == 1 {
                        in_entry = false;
                        match current_loc.take() {
                            Some(loc) if !loc.is_empty() => urls.push(loc),
                            _ => return Err(malformed("entry without <loc>")),
                        }
                    } else if depth == 0 {
                        root_closed = true;
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(malformed(format!(
                        "XML parse error at byte {}: {e}",
                        reader.buffer_position()
                    )));
                }
                _ => {}
            }
        }

        let Some(kind) = kind else {
            return Err(malformed("document has no root element"));
        };
        if !root_closed {
            return Err(malformed("unexpected end of document"));
        }

        debug!(?kind, count = urls.len(), "Parsed sitemap");
        Ok(Manifest { kind, urls })
    }
}

fn root_kind(name: &[u8]) -> Result<ManifestKind, MonitorError> {
    match name {
        b"urlset" => Ok(ManifestKind::UrlSet),
        b"sitemapindex" => Ok(ManifestKind::Index),
        other => Err(malformed(format!(
            "unexpected root element <{}>",
            String::from_utf8_lossy(other)
        ))),
    }
}

fn malformed(reason: impl Into<String>) -> MonitorError {
    MonitorError::MalformedManifest(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Result<Manifest, MonitorError> {
        ManifestParser.parse(xml)
    }

    #[test]
    fn test_parse_urlset_in_document_order() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
          <url>
            <loc>https://example.com/games/zeta</loc>
            <lastmod>2024-01-15</lastmod>
          </url>
          <url>
            <loc>https://example.com/games/alpha</loc>
            <priority>0.8</priority>
          </url>
        </urlset>"#;

        let manifest = parse(xml).unwrap();
        assert_eq!(manifest.kind, ManifestKind::UrlSet);
        assert_eq!(
            manifest.urls,
            vec!["https://example.com/games/zeta", "https://example.com/games/alpha"]
        );
    }

    #[test]
    fn test_parse_index_is_not_flattened() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
          <sitemap><loc>a.xml</loc></sitemap>
          <sitemap><loc>b.xml</loc><lastmod>2024-02-01</lastmod></sitemap>
        </sitemapindex>"#;

        let manifest = parse(xml).unwrap();
        assert_eq!(manifest.kind, ManifestKind::Index);
        assert_eq!(manifest.urls, vec!["a.xml", "b.xml"]);
    }

    #[test]
    fn test_entities_and_cdata_in_loc() {
        let xml = "<urlset><url><loc>https://example.com/?a=1&amp;b=2</loc></url>\
                   <url><loc><![CDATA[https://example.com/c]]></loc></url></urlset>";
        let manifest = parse(xml).unwrap();
        assert_eq!(
            manifest.urls,
            vec!["https://example.com/?a=1&b=2", "https://example.com/c"]
        );
    }

    #[test]
    fn test_prefixed_namespace() {
        let xml = r#"<sm:urlset xmlns:sm="http://www.sitemaps.org/schemas/sitemap/0.9">
            <sm:url><sm:loc>https://example.com/x</sm:loc></sm:url>
        </sm:urlset>"#;
        assert_eq!(parse(xml).unwrap().urls, vec!["https://example.com/x"]);
    }

    #[test]
    fn test_empty_urlset_parses_to_empty_list() {
        assert!(parse("<urlset></urlset>").unwrap().urls.is_empty());
        assert!(parse("<?xml version=\"1.0\"?><urlset/>").unwrap().urls.is_empty());
    }

    #[test]
    fn test_unknown_root_is_malformed() {
        let err = parse("<html><body>moved</body></html>").unwrap_err();
        assert!(matches!(err, MonitorError::MalformedManifest(_)));
    }

    #[test]
    fn test_entry_without_loc_is_malformed() {
        assert!(matches!(
            parse("<urlset><url><lastmod>2024-01-01</lastmod></url></urlset>"),
            Err(MonitorError::MalformedManifest(_))
        ));
        assert!(matches!(
            parse("<urlset><url><loc></loc></url></urlset>"),
            Err(MonitorError::MalformedManifest(_))
        ));
    }

    #[test]
    fn test_truncated_document_is_malformed() {
        assert!(matches!(
            parse("<urlset><url><loc>https://example.com/a</loc></url>"),
            Err(MonitorError::MalformedManifest(_))
        ));
    }

    #[test]
    fn test_garbage_never_panics() {
        let inputs = [
            "",
            "not xml at all",
            "<",
            "<<<>>>",
            "<urlset><url>",
            "</urlset>",
            "\x00\x01\x02",
            "<urlset><url><loc>x</loc></url></urlset><urlset/>",
        ];
        for input in inputs {
            assert!(parse(input).is_err(), "expected error for {input:?}");
        }
    }
}
