//! Product query and query variant generation
//!
//! Retail site search is inconsistent about model codes: one shop indexes
//! `AC-381`, another `AC381`, a third `AC 381`. The normalizer expands a query
//! into every spelling so that discovery can try them in order.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::{ScrapeError, ScrapeResult};
use crate::utils::collapse_whitespace;

/// Letter prefix, optional hyphen, 2-4 digits, optional letter-led suffix
static MODEL_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<prefix>[A-Za-z]{1,4})-?(?P<digits>[0-9]{2,4})(?P<suffix>[A-Za-z][A-Za-z0-9]*)?$")
        .expect("model code pattern is valid")
});

/// Raw product query as submitted by a user, whitespace-normalized
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query {
    text: String,
}

impl Query {
    /// Validate and normalize user input. Empty or whitespace-only input is rejected.
    pub fn parse(raw: &str) -> ScrapeResult<Self> {
        let text = collapse_whitespace(raw);
        if text.is_empty() {
            return Err(ScrapeError::InvalidQuery);
        }
        Ok(Self { text })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Ordered search variants; the query itself is always first.
    pub fn variants(&self) -> Vec<String> {
        variants(&self.text)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl AsRef<str> for Query {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Expand a query into its search variants.
///
/// For each model-code token two extra variants are produced, each substituted
/// back into the full query: the hyphen-free spelling and the spelling with a
/// space between letters and digits. Duplicates are dropped keeping first-seen
/// order.
pub fn variants(query: &str) -> Vec<String> {
    let normalized = collapse_whitespace(query);
    let tokens: Vec<&str> = normalized.split(' ').collect();

    let mut out = vec![normalized.clone()];

    for (index, token) in tokens.iter().enumerate() {
        let Some(caps) = MODEL_CODE.captures(token) else {
            continue;
        };
        let prefix = &caps["prefix"];
        let digits = &caps["digits"];
        let suffix = caps.name("suffix").map_or("", |m| m.as_str());

        let collapsed = format!("{prefix}{digits}{suffix}");
        let spaced = format!("{prefix} {digits}{suffix}");

        for replacement in [collapsed, spaced] {
            let mut substituted = tokens.clone();
            substituted[index] = replacement.as_str();
            push_unique(&mut out, substituted.join(" "));
        }
    }

    out
}

fn push_unique(out: &mut Vec<String>, candidate: String) {
    if !out.contains(&candidate) {
        out.push(candidate);
    }
}
