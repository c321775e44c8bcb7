//! URL frontier
//!
//! Owns the queue of pages still to visit and the set of normalized URLs
//! already accepted. A URL enters the visited set the moment it is accepted,
//! before any fetch is dispatched, so the same page can never be fetched
//! twice. Entries come out in the order they went in (breadth-first).
//!
//! The normalized form is only a key. Pages are fetched at the URL as it was
//! discovered, minus its fragment.

use crate::url::{extract_domain, normalize_url};
use std::collections::{HashSet, VecDeque};
use url::Url;

/// A page waiting to be visited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Normalized URL, the key in the visited set and in results
    pub url: Url,

    /// URL as discovered, without fragment; this is what gets fetched
    pub target: Url,

    /// Link distance from the seed
    pub depth: u32,

    /// Page the URL was discovered on (None for seeds)
    pub origin: Option<String>,
}

impl FrontierEntry {
    /// An entry whose fetch target is its normalized URL
    pub fn new(url: Url, depth: u32, origin: Option<String>) -> Self {
        Self {
            target: url.clone(),
            url,
            depth,
            origin,
        }
    }
}

/// Acceptance limits for a frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontierPolicy {
    /// Maximum number of URLs ever accepted
    pub max_pages: usize,

    /// Deepest depth accepted
    pub max_depth: u32,

    /// Only accept URLs on the root URL's host
    pub same_domain_only: bool,
}

/// Result of offering a URL to the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    /// Queued for a visit
    Accepted,
    /// Not a normalizable http(s) URL
    Invalid,
    /// Already accepted earlier
    AlreadyVisited,
    /// Deeper than the policy allows
    TooDeep,
    /// Host differs from the root host
    OffDomain,
    /// Page budget already spent
    BudgetExhausted,
}

/// Queue plus visited set
#[derive(Debug)]
pub struct Frontier {
    root_host: Option<String>,
    policy: FrontierPolicy,
    queue: VecDeque<FrontierEntry>,
    visited: HashSet<String>,
    accepted: usize,
    budget_rejections: usize,
}

impl Frontier {
    /// Creates an empty frontier scoped to `root`
    pub fn new(root: &Url, policy: FrontierPolicy) -> Self {
        Self {
            root_host: extract_domain(root),
            policy,
            queue: VecDeque::new(),
            visited: HashSet::new(),
            accepted: 0,
            budget_rejections: 0,
        }
    }

    /// Offers a candidate URL
    ///
    /// Checks run in order: normalization, visited set, depth, domain scope,
    /// page budget. Offering past the budget is not an error.
    pub fn offer(&mut self, url: &str, depth: u32, origin: Option<&str>) -> OfferOutcome {
        let normalized = match normalize_url(url) {
            Ok(u) => u,
            Err(_) => return OfferOutcome::Invalid,
        };

        if self.visited.contains(normalized.as_str()) {
            return OfferOutcome::AlreadyVisited;
        }

        if depth > self.policy.max_depth {
            return OfferOutcome::TooDeep;
        }

        if self.policy.same_domain_only && extract_domain(&normalized) != self.root_host {
            return OfferOutcome::OffDomain;
        }

        if self.accepted >= self.policy.max_pages {
            self.budget_rejections += 1;
            return OfferOutcome::BudgetExhausted;
        }

        let mut target = Url::parse(url.trim()).unwrap_or_else(|_| normalized.clone());
        target.set_fragment(None);

        self.visited.insert(normalized.as_str().to_string());
        self.accepted += 1;
        self.queue.push_back(FrontierEntry {
            url: normalized,
            target,
            depth,
            origin: origin.map(|o| o.to_string()),
        });

        OfferOutcome::Accepted
    }

    /// Takes the oldest pending entry
    pub fn take(&mut self) -> Option<FrontierEntry> {
        self.queue.pop_front()
    }

    /// Takes up to `n` pending entries in queue order
    pub fn take_batch(&mut self, n: usize) -> Vec<FrontierEntry> {
        let n = n.min(self.queue.len());
        self.queue.drain(..n).collect()
    }

    /// Number of entries still pending
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of URLs accepted so far (pending or taken)
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// Returns true if a new URL was turned away because the budget was spent
    pub fn budget_exhausted(&self) -> bool {
        self.budget_rejections > 0
    }

    pub fn policy(&self) -> &FrontierPolicy {
        &self.policy
    }
}
