//! Sitemap XML parsing
//!
//! Recognizes the two sitemap document types by their root element:
//! `<urlset>` lists pages, `<sitemapindex>` lists further sitemaps. Only
//! `<loc>` elements directly inside `<url>` or `<sitemap>` entries are read.

use crate::ErrorKind;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// Failure to expand a sitemap document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SitemapError {
    #[error("Malformed sitemap XML: {0}")]
    Xml(String),

    #[error("Unexpected root element <{0}>")]
    UnexpectedRoot(String),

    #[error("Sitemap document is empty")]
    Empty,

    #[error("Sitemap document ended inside <{0}>")]
    Unclosed(String),

    #[error("Failed to fetch sitemap {url}: {message}")]
    Fetch { url: String, message: String },
}

impl SitemapError {
    /// Returns the job-facing category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Fetch { .. } => ErrorKind::FetchError,
            Self::Xml(_) | Self::UnexpectedRoot(_) | Self::Empty | Self::Unclosed(_) => {
                ErrorKind::ParseError
            }
        }
    }
}

/// A parsed sitemap document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// `<sitemapindex>`: locations of further sitemaps
    Index(Vec<String>),
    /// `<urlset>`: page locations
    UrlSet(Vec<String>),
}

impl SitemapDocument {
    pub fn locations(&self) -> &[String] {
        match self {
            Self::Index(locs) | Self::UrlSet(locs) => locs,
        }
    }
}

#[derive(Clone, Copy)]
enum Root {
    Index,
    UrlSet,
}

/// Parses a sitemap document
///
/// Locations are returned in document order with surrounding whitespace
/// removed; blank `<loc>` elements are skipped.
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument, SitemapError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut root: Option<Root> = None;
    let mut locs = Vec::new();
    let mut current_loc: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = element_name(e.local_name().as_ref());
                if open.is_empty() {
                    root = Some(detect_root(&name, root.is_some())?);
                } else if name == "loc" && in_entry(&open) {
                    current_loc = Some(String::new());
                }
                open.push(name);
            }
            Ok(Event::Empty(ref e)) => {
                if open.is_empty() {
                    let name = element_name(e.local_name().as_ref());
                    root = Some(detect_root(&name, root.is_some())?);
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some(loc) = current_loc.as_mut() {
                    let text = e.unescape().map_err(|e| SitemapError::Xml(e.to_string()))?;
                    loc.push_str(&text);
                }
            }
            Ok(Event::CData(ref e)) => {
                if let Some(loc) = current_loc.as_mut() {
                    loc.push_str(&String::from_utf8_lossy(&**e));
                }
            }
            Ok(Event::End(_)) => {
                if open.pop().as_deref() == Some("loc") {
                    if let Some(loc) = current_loc.take() {
                        let loc = loc.trim();
                        if !loc.is_empty() {
                            locs.push(loc.to_string());
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SitemapError::Xml(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    if let Some(name) = open.pop() {
        return Err(SitemapError::Unclosed(name));
    }

    match root {
        Some(Root::Index) => Ok(SitemapDocument::Index(locs)),
        Some(Root::UrlSet) => Ok(SitemapDocument::UrlSet(locs)),
        None => Err(SitemapError::Empty),
    }
}

fn element_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_ascii_lowercase()
}

fn detect_root(name: &str, seen_root: bool) -> Result<Root, SitemapError> {
    if seen_root {
        return Err(SitemapError::Xml(format!(
            "second root element <{}>",
            name
        )));
    }
    match name {
        "sitemapindex" => Ok(Root::Index),
        "urlset" => Ok(Root::UrlSet),
        other => Err(SitemapError::UnexpectedRoot(other.to_string())),
    }
}

fn in_entry(open: &[String]) -> bool {
    matches!(open.last().map(String::as_str), Some("url") | Some("sitemap"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_urlset() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>http://example.com/a</loc><lastmod>2024-01-01</lastmod></url>
  <url><loc> http://example.com/b </loc></url>
  <url><loc>http://example.com/c?x=1&amp;y=2</loc></url>
</urlset>"#;

        let doc = parse_sitemap(xml).unwrap();
        assert_eq!(
            doc,
            SitemapDocument::UrlSet(vec![
                "http://example.com/a".to_string(),
                "http://example.com/b".to_string(),
                "http://example.com/c?x=1&y=2".to_string(),
            ])
        );
    }

    #[test]
    fn test_parse_index() {
        let xml = r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>http://example.com/s1.xml</loc></sitemap>
  <sitemap><loc>http://example.com/s2.xml</loc></sitemap>
</sitemapindex>"#;

        let doc = parse_sitemap(xml).unwrap();
        assert_eq!(
            doc,
            SitemapDocument::Index(vec![
                "http://example.com/s1.xml".to_string(),
                "http://example.com/s2.xml".to_string(),
            ])
        );
    }

    #[test]
    fn test_prefixed_namespace() {
        let xml = r#"<sm:urlset xmlns:sm="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sm:url><sm:loc>http://example.com/</sm:loc></sm:url>
</sm:urlset>"#;

        let doc = parse_sitemap(xml).unwrap();
        assert_eq!(doc.locations(), ["http://example.com/".to_string()]);
    }

    #[test]
    fn test_cdata_loc() {
        let xml = "<urlset><url><loc><![CDATA[http://example.com/x]]></loc></url></urlset>";
        let doc = parse_sitemap(xml).unwrap();
        assert_eq!(doc.locations(), ["http://example.com/x".to_string()]);
    }

    #[test]
    fn test_ignores_loc_outside_entries() {
        let xml = r#"<urlset>
  <loc>http://example.com/stray</loc>
  <url><image:image><image:loc>http://example.com/img.png</image:loc></image:image>
       <loc>http://example.com/page</loc></url>
</urlset>"#;

        let doc = parse_sitemap(xml).unwrap();
        assert_eq!(doc.locations(), ["http://example.com/page".to_string()]);
    }

    #[test]
    fn test_empty_urlset() {
        assert_eq!(
            parse_sitemap("<urlset/>").unwrap(),
            SitemapDocument::UrlSet(vec![])
        );
        assert_eq!(
            parse_sitemap("<urlset></urlset>").unwrap(),
            SitemapDocument::UrlSet(vec![])
        );
    }

    #[test]
    fn test_unexpected_root() {
        let err = parse_sitemap("<html><body>not a sitemap</body></html>").unwrap_err();
        assert_eq!(err, SitemapError::UnexpectedRoot("html".to_string()));
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(parse_sitemap("").unwrap_err(), SitemapError::Empty);
        assert_eq!(SitemapError::Empty.kind(), ErrorKind::ParseError);
    }

    #[test]
    fn test_malformed_documents() {
        assert!(parse_sitemap("<urlset><url><loc>http://x.com/</loc></url>").is_err());
        assert!(parse_sitemap("<urlset><url></loc></url></urlset>").is_err());
    }

    #[test]
    fn test_error_kinds() {
        let unclosed = parse_sitemap("<urlset><url>").unwrap_err();
        assert_eq!(unclosed.kind(), ErrorKind::ParseError);

        let fetch = SitemapError::Fetch {
            url: "http://example.com/sitemap.xml".to_string(),
            message: "HTTP 404".to_string(),
        };
        assert_eq!(fetch.kind(), ErrorKind::FetchError);
    }
}
