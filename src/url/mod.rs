//! URL handling module for Sumi-Glean
//!
//! This module provides URL normalization and host comparison used by the
//! frontier for duplicate suppression and domain scoping.

mod domain;
mod normalize;

pub use domain::{extract_domain, same_host};
pub use normalize::normalize_url;
