//! Error taxonomy for the price extraction pipeline
//!
//! Every per-site failure is non-fatal: the aggregator folds it into a
//! `PriceResult` note. Only configuration errors abort, and only at startup.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScrapeError {
    #[error("Query is empty")]
    InvalidQuery,

    #[error("No product page found on {site} after {variants_tried} query variant(s)")]
    DiscoveryFailed { site: String, variants_tried: usize },

    #[error("Fetch failed for {url} after {attempts} attempt(s): {reason}")]
    FetchFailed {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("No price found on {site} page {url}")]
    ExtractionIncomplete { site: String, url: String },

    #[error("{site} did not finish within {seconds}s")]
    Timeout { site: String, seconds: u64 },

    #[error("Configuration error in '{field}': {message}")]
    Configuration { field: String, message: String },
}

impl ScrapeError {
    pub fn discovery_failed(site: &str, variants_tried: usize) -> Self {
        Self::DiscoveryFailed {
            site: site.to_string(),
            variants_tried,
        }
    }

    pub fn fetch_failed(url: &str, attempts: u32, reason: impl Into<String>) -> Self {
        Self::FetchFailed {
            url: url.to_string(),
            attempts,
            reason: reason.into(),
        }
    }

    pub fn extraction_incomplete(site: &str, url: &str) -> Self {
        Self::ExtractionIncomplete {
            site: site.to_string(),
            url: url.to_string(),
        }
    }

    pub fn configuration(field: &str, message: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Only malformed configuration stops the process.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Human-readable note attached to a failed `PriceResult`
    pub fn note(&self) -> String {
        match self {
            Self::InvalidQuery => "Query is empty".to_string(),
            Self::DiscoveryFailed { .. } => "Product not found on this site".to_string(),
            Self::FetchFailed { attempts, reason, .. } => {
                format!("Fetch failed after {attempts} attempt(s): {reason}")
            }
            Self::ExtractionIncomplete { .. } => {
                "No price found; the page may render prices client-side".to_string()
            }
            Self::Timeout { seconds, .. } => {
                format!("Fetch failed: no complete response within the {seconds}s site deadline")
            }
            Self::Configuration { field, message } => {
                format!("Configuration error in '{field}': {message}")
            }
        }
    }
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;
