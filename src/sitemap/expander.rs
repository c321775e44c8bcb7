//! Recursive sitemap expansion
//!
//! Fetches a sitemap and, for sitemap indexes, every sitemap it references.
//! Recursion is bounded by a depth guard plus a set of sitemap URLs already
//! expanded, so cyclic indexes terminate. Reaching the guard truncates the
//! expansion without failing it.

use crate::crawler::Fetcher;
use crate::sitemap::parser::{parse_sitemap, SitemapDocument, SitemapError};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashSet;
use std::sync::Arc;

/// Outcome of expanding a sitemap tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitemapExpansion {
    /// Page locations in document order (index order, then urlset order)
    pub urls: Vec<String>,

    /// Nested sitemaps that could not be fetched or parsed
    pub failures: Vec<(String, SitemapError)>,

    /// Number of sitemap documents fetched
    pub sitemaps_fetched: usize,

    /// True if the depth guard or cycle check skipped a referenced sitemap
    pub truncated: bool,
}

/// Expands sitemap documents through a fetcher
pub struct SitemapExpander {
    fetcher: Arc<dyn Fetcher>,
    max_depth: u32,
}

impl SitemapExpander {
    /// Creates an expander
    ///
    /// `max_depth` counts nesting levels below the root sitemap; a root
    /// index with `max_depth = 1` expands its children but not theirs.
    pub fn new(fetcher: Arc<dyn Fetcher>, max_depth: u32) -> Self {
        Self { fetcher, max_depth }
    }

    /// Expands the sitemap at `url`
    ///
    /// Returns an error only when the root document itself cannot be fetched
    /// or parsed. Failures of nested sitemaps are recorded in the expansion.
    pub async fn expand(&self, url: &str) -> Result<SitemapExpansion, SitemapError> {
        let mut expansion = SitemapExpansion::default();
        let mut seen = HashSet::new();
        seen.insert(url.to_string());

        let document = self.load(url).await?;
        expansion.sitemaps_fetched += 1;
        self.absorb(document, 0, &mut seen, &mut expansion).await;

        tracing::info!(
            "Expanded sitemap {}: {} URLs from {} document(s)",
            url,
            expansion.urls.len(),
            expansion.sitemaps_fetched
        );

        Ok(expansion)
    }

    /// Adds a parsed document's locations, recursing into index children
    fn absorb<'a>(
        &'a self,
        document: SitemapDocument,
        depth: u32,
        seen: &'a mut HashSet<String>,
        expansion: &'a mut SitemapExpansion,
    ) -> BoxFuture<'a, ()> {
        async move {
            let children = match document {
                SitemapDocument::UrlSet(urls) => {
                    expansion.urls.extend(urls);
                    return;
                }
                SitemapDocument::Index(children) => children,
            };

            for child in children {
                if depth >= self.max_depth {
                    tracing::warn!("Sitemap depth guard reached, skipping {}", child);
                    expansion.truncated = true;
                    continue;
                }
                if !seen.insert(child.clone()) {
                    tracing::warn!("Sitemap {} already expanded, skipping", child);
                    expansion.truncated = true;
                    continue;
                }

                match self.load(&child).await {
                    Ok(document) => {
                        expansion.sitemaps_fetched += 1;
                        self.absorb(document, depth + 1, seen, expansion).await;
                    }
                    Err(e) => {
                        tracing::warn!("Skipping sitemap {}: {}", child, e);
                        expansion.failures.push((child, e));
                    }
                }
            }
        }
        .boxed()
    }

    async fn load(&self, url: &str) -> Result<SitemapDocument, SitemapError> {
        let page = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|e| SitemapError::Fetch {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        parse_sitemap(&page.body)
    }
}
