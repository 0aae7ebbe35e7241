//! Per-site price result and the ordered result set
//!
//! One `PriceResult` exists per site per query whatever happened on that
//! site. Failures carry a note instead of price data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::ScrapeError;
use crate::utils::site_key;

/// Which extraction stage produced the price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// JSON-LD offers or Open Graph product metadata
    StructuredData,
    /// Site-specific or generic CSS selector
    Selector,
    /// Currency pattern in the visible page text
    PageText,
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::StructuredData => "structured data",
            Self::Selector => "selector",
            Self::PageText => "page text",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceResult {
    pub site: String,
    pub title: Option<String>,
    /// Canonical `1.234.567 ₫` form
    pub price: Option<String>,
    pub original_price: Option<String>,
    pub promo: Option<String>,
    pub url: Option<String>,
    pub price_source: Option<PriceSource>,
    pub http_status: Option<u16>,
    /// Diagnostic note: failure summary or low-confidence warning
    pub note: Option<String>,
}

impl PriceResult {
    /// Empty result for a site, filled in by the builder methods
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            title: None,
            price: None,
            original_price: None,
            promo: None,
            url: None,
            price_source: None,
            http_status: None,
            note: None,
        }
    }

    /// Result carrying only the site and the error summary
    pub fn failed(site: impl Into<String>, error: &ScrapeError) -> Self {
        Self::new(site).with_note(error.note())
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub const fn is_priced(&self) -> bool {
        self.price.is_some()
    }
}

/// Ordered results, one per registered adapter, in registration order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSet {
    pub query: String,
    pub scraped_at: DateTime<Utc>,
    pub results: Vec<PriceResult>,
}

impl ResultSet {
    pub fn new(query: impl Into<String>, results: Vec<PriceResult>) -> Self {
        Self {
            query: query.into(),
            scraped_at: Utc::now(),
            results,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PriceResult> {
        self.results.iter()
    }

    /// Case-insensitive lookup, matching `SiteRegistry::find`
    pub fn get(&self, site: &str) -> Option<&PriceResult> {
        let wanted = site_key(site);
        self.results.iter().find(|r| site_key(&r.site) == wanted)
    }

    pub fn priced(&self) -> impl Iterator<Item = &PriceResult> {
        self.results.iter().filter(|r| r.is_priced())
    }

    pub fn failed(&self) -> impl Iterator<Item = &PriceResult> {
        self.results.iter().filter(|r| !r.is_priced())
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a PriceResult;
    type IntoIter = std::slice::Iter<'a, PriceResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_result_carries_only_site_and_note() {
        let result = PriceResult::failed("Pico", &ScrapeError::discovery_failed("Pico", 2));
        assert_eq!(result.site, "Pico");
        assert!(result.price.is_none());
        assert!(result.title.is_none());
        assert_eq!(result.note.as_deref(), Some("Product not found on this site"));
    }

    #[test]
    fn result_set_views() {
        let mut priced = PriceResult::new("Nguyễn Kim");
        priced.price = Some("12.990.000 ₫".to_string());
        let set = ResultSet::new(
            "Tivi LG",
            vec![priced, PriceResult::failed("Pico", &ScrapeError::InvalidQuery)],
        );

        assert_eq!(set.len(), 2);
        assert_eq!(set.priced().count(), 1);
        assert_eq!(set.failed().next().unwrap().site, "Pico");
        assert!(set.get("pico").is_some());
        assert!(set.get("NGUYỄN KIM").is_some());
    }

    #[test]
    fn price_source_serializes_snake_case() {
        let json = serde_json::to_string(&PriceSource::StructuredData).unwrap();
        assert_eq!(json, "\"structured_data\"");
    }
}
