//! Selector rule definitions and compilation
//!
//! A rule is a CSS selector, optionally targeting an attribute. Rules arrive
//! either as a JSON mapping (`{"title": "h1", "link": "a@href"}` or
//! `{"link": {"selector": "a", "attribute": "href"}}`) or as `field: selector`
//! lines.

use indexmap::IndexMap;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors raised while reading or compiling selector rules
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("selectors must be a mapping of field name to rule")]
    NotAMapping,

    #[error("field names cannot be empty")]
    EmptyName,

    #[error("invalid rule for field '{name}': {reason}")]
    InvalidRule { name: String, reason: String },

    #[error("invalid CSS selector '{selector}' for field '{name}': {reason}")]
    InvalidSelector {
        name: String,
        selector: String,
        reason: String,
    },

    #[error("line {line}: {reason}")]
    Line { line: usize, reason: String },
}

/// One extraction rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorRule {
    /// CSS selector matched against the document
    pub selector: String,

    /// Attribute read from each match; text content when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl SelectorRule {
    /// Builds a text-extracting rule
    pub fn text(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            attribute: None,
        }
    }

    /// Builds an attribute-extracting rule
    pub fn attribute(selector: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            attribute: Some(attribute.into()),
        }
    }

    /// Parses the string form of a rule
    ///
    /// A trailing `@name` outside any bracket or quote selects an attribute:
    /// `a.next@href` reads `href` from every `a.next`.
    pub fn parse(rule: &str) -> Self {
        let rule = rule.trim();
        if let Some(idx) = rule.rfind('@') {
            let (css, attr) = (&rule[..idx], &rule[idx + 1..]);
            if is_attribute_name(attr) && is_balanced(css) {
                return Self::attribute(css.trim(), attr);
            }
        }
        Self::text(rule)
    }
}

fn is_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}

/// True if every bracket is closed and no quoted string is left open
fn is_balanced(css: &str) -> bool {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    for c in css.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth -= 1,
            _ => {}
        }
    }
    depth == 0 && quote.is_none()
}

/// Reads a selectors mapping from an arbitrary JSON value
///
/// Field order is preserved so output columns are stable.
pub fn rules_from_json(value: &Value) -> Result<IndexMap<String, SelectorRule>, RuleError> {
    let object = match value {
        Value::Object(object) => object,
        Value::Null => return Ok(IndexMap::new()),
        _ => return Err(RuleError::NotAMapping),
    };

    let mut rules = IndexMap::with_capacity(object.len());
    for (name, rule) in object {
        let name = name.trim();
        if name.is_empty() {
            return Err(RuleError::EmptyName);
        }

        let rule = match rule {
            Value::String(s) => SelectorRule::parse(s),
            Value::Object(_) => serde_json::from_value::<SelectorRule>(rule.clone()).map_err(
                |e| RuleError::InvalidRule {
                    name: name.to_string(),
                    reason: e.to_string(),
                },
            )?,
            other => {
                return Err(RuleError::InvalidRule {
                    name: name.to_string(),
                    reason: format!("expected a string or an object, got {}", other),
                })
            }
        };

        rules.insert(name.to_string(), rule);
    }

    Ok(rules)
}

/// Parses the line-based `field: selector` format
///
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_selector_lines(text: &str) -> Result<IndexMap<String, SelectorRule>, RuleError> {
    let mut rules = IndexMap::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (name, rule) = line.split_once(':').ok_or_else(|| RuleError::Line {
            line: idx + 1,
            reason: "expected 'field: selector'".to_string(),
        })?;

        let name = name.trim();
        let rule = rule.trim();
        if name.is_empty() || rule.is_empty() {
            return Err(RuleError::Line {
                line: idx + 1,
                reason: "field name and selector are both required".to_string(),
            });
        }

        rules.insert(name.to_string(), SelectorRule::parse(rule));
    }

    Ok(rules)
}

/// A rule with its selector compiled
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub name: String,
    pub rule: SelectorRule,
    pub(crate) selector: Selector,
}

/// Ordered set of compiled rules ready to run against documents
#[derive(Debug, Clone, Default)]
pub struct SelectorSet {
    rules: Vec<CompiledRule>,
}

impl SelectorSet {
    /// Compiles every rule; the first invalid selector aborts compilation
    pub fn compile(rules: &IndexMap<String, SelectorRule>) -> Result<Self, RuleError> {
        let mut compiled = Vec::with_capacity(rules.len());

        for (name, rule) in rules {
            if rule.selector.trim().is_empty() {
                return Err(RuleError::InvalidRule {
                    name: name.clone(),
                    reason: "selector cannot be empty".to_string(),
                });
            }

            let selector =
                Selector::parse(&rule.selector).map_err(|e| RuleError::InvalidSelector {
                    name: name.clone(),
                    selector: rule.selector.clone(),
                    reason: e.to_string(),
                })?;

            compiled.push(CompiledRule {
                name: name.clone(),
                rule: rule.clone(),
                selector,
            });
        }

        Ok(Self { rules: compiled })
    }

    /// Returns true if there are no rules (link-collection only)
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter()
    }
}
