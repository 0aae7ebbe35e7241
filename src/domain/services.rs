//! Domain services
//!
//! Outbound capabilities the core consumes. Implementations live in the
//! infrastructure layer; tests substitute in-memory fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::errors::ScrapeResult;

/// Statuses whose bodies are still handed to the parser. Retailers commonly
/// answer bots with 403/503 challenge pages that embed the structured offer.
pub const PARSEABLE_STATUSES: [u16; 3] = [200, 403, 503];

/// A retrieved page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    /// Parseable but possibly a bot-challenge page
    pub const fn is_degraded(&self) -> bool {
        self.status != 200
    }
}

/// HTTP GET with bounded timeout and retry
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a page. Fails with `ScrapeError::FetchFailed` once retries are exhausted.
    async fn get(&self, url: &str) -> ScrapeResult<FetchedPage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_non_ok_statuses_are_degraded() {
        assert!(!FetchedPage::new("https://pico.vn", 200, "").is_degraded());
        assert!(FetchedPage::new("https://pico.vn", 403, "").is_degraded());
        assert!(FetchedPage::new("https://pico.vn", 503, "").is_degraded());
    }
}
