//! Sitemap expander
//!
//! Turns a sitemap URL into the ordered list of page URLs it describes,
//! following sitemap indexes down to a bounded depth.

mod expander;
mod parser;

pub use expander::{SitemapExpander, SitemapExpansion};
pub use parser::{parse_sitemap, SitemapDocument, SitemapError};
