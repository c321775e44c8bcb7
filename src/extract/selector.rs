//! Applies compiled selector rules to a parsed document

use crate::extract::rules::{CompiledRule, SelectorSet};
use indexmap::IndexMap;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

/// Value extracted for one field
///
/// One match yields `Single`; zero or several matches yield `Multiple`, so a
/// field that matched nothing is still present as an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Single(String),
    Multiple(Vec<String>),
}

impl FieldValue {
    /// The explicit "no match" value
    pub fn empty() -> Self {
        Self::Multiple(Vec::new())
    }

    /// Builds a value from all matches, preserving the one-match asymmetry
    pub fn from_matches(mut values: Vec<String>) -> Self {
        if values.len() == 1 {
            Self::Single(values.remove(0))
        } else {
            Self::Multiple(values)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Multiple(v) if v.is_empty())
    }

    /// All values in document order
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(v) => vec![v.as_str()],
            Self::Multiple(vs) => vs.iter().map(String::as_str).collect(),
        }
    }
}

/// Runs every rule against the document
///
/// Every rule name appears in the output, matched or not.
pub fn extract_fields(document: &Html, selectors: &SelectorSet) -> IndexMap<String, FieldValue> {
    let mut fields = IndexMap::with_capacity(selectors.len());

    for rule in selectors.iter() {
        let values: Vec<String> = document
            .select(&rule.selector)
            .filter_map(|element| element_value(element, rule))
            .collect();

        tracing::trace!("Rule '{}' matched {} element(s)", rule.name, values.len());
        fields.insert(rule.name.clone(), FieldValue::from_matches(values));
    }

    fields
}

/// Reads the value a rule wants from one element
///
/// Elements lacking the targeted attribute are skipped.
fn element_value(element: ElementRef<'_>, rule: &CompiledRule) -> Option<String> {
    match &rule.rule.attribute {
        Some(attr) => element.value().attr(attr).map(|v| v.trim().to_string()),
        None => Some(element.text().collect::<String>().trim().to_string()),
    }
}
