//! Selector engine
//!
//! This module turns fetched HTML into a record of named fields and the list
//! of hyperlinks found on the page:
//! - `rules`: rule grammar, JSON/line parsing and compilation
//! - `selector`: applying compiled rules to a document
//! - `links`: hyperlink collection and resolution

mod links;
mod rules;
mod selector;

pub use links::extract_links;
pub use rules::{
    parse_selector_lines, rules_from_json, CompiledRule, RuleError, SelectorRule, SelectorSet,
};
pub use selector::{extract_fields, FieldValue};

use indexmap::IndexMap;
use scraper::Html;
use url::Url;

/// Everything extracted from one page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// Field name to extracted value, in rule order
    pub fields: IndexMap<String, FieldValue>,

    /// Absolute hyperlink targets in document order
    pub links: Vec<String>,
}

/// Parses an HTML page and runs the selector engine over it
///
/// # Example
///
/// ```
/// use indexmap::IndexMap;
/// use sumi_glean::extract::{parse_page, FieldValue, SelectorRule, SelectorSet};
/// use url::Url;
///
/// let mut rules = IndexMap::new();
/// rules.insert("title".to_string(), SelectorRule::text("h1"));
/// let selectors = SelectorSet::compile(&rules).unwrap();
///
/// let html = r#"<html><body><h1>Test</h1><a href="/next">Next</a></body></html>"#;
/// let page_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_page(html, &page_url, &selectors);
///
/// assert_eq!(parsed.fields["title"], FieldValue::Single("Test".to_string()));
/// assert_eq!(parsed.links, vec!["https://example.com/next"]);
/// ```
pub fn parse_page(html: &str, page_url: &Url, selectors: &SelectorSet) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        fields: extract_fields(&document, selectors),
        links: extract_links(&document, page_url),
    }
}
