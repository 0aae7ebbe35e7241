//! Product page discovery
//!
//! Walks a site's search endpoints for each query variant and returns the
//! first product link found. Individual search page failures are logged and
//! skipped; only the final outcome leaves this module.

use scraper::Html;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::site_adapter::WEB_SEARCH_ENDPOINT;
use crate::domain::{PageFetcher, ScrapeError, ScrapeResult};
use crate::infrastructure::parsing::{find_product_link, ScanMode};
use crate::infrastructure::sites::CompiledSite;

/// Where a product was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub url: Url,
    /// Query variant that produced the hit
    pub variant: String,
}

pub struct ProductLocator {
    fetcher: Arc<dyn PageFetcher>,
    web_search_fallback: bool,
}

/// Per-variant scan outcome
enum SearchOutcome {
    Found(Url),
    /// At least one search page was fetched, none had a product link
    NotFound,
    /// No search page could be fetched at all
    Unreachable(ScrapeError),
}

impl ProductLocator {
    pub fn new(fetcher: Arc<dyn PageFetcher>, web_search_fallback: bool) -> Self {
        Self {
            fetcher,
            web_search_fallback,
        }
    }

    /// First product URL for one variant, or `None`.
    pub async fn find_product_url(&self, site: &CompiledSite, variant: &str) -> Option<Url> {
        match self.search(site, variant).await {
            SearchOutcome::Found(url) => Some(url),
            SearchOutcome::NotFound | SearchOutcome::Unreachable(_) => None,
        }
    }

    /// Try variants in order; the first hit wins.
    ///
    /// Fails with `DiscoveryFailed` when every variant came up empty, or with
    /// the last `FetchFailed` when no search page was reachable at all.
    pub async fn locate(&self, site: &CompiledSite, variants: &[String]) -> ScrapeResult<Located> {
        let mut last_fetch_error = None;
        let mut any_page_fetched = false;

        for variant in variants {
            match self.search(site, variant).await {
                SearchOutcome::Found(url) => {
                    info!("🔎 {}: '{}' -> {}", site.name(), variant, url);
                    return Ok(Located {
                        url,
                        variant: variant.clone(),
                    });
                }
                SearchOutcome::NotFound => any_page_fetched = true,
                SearchOutcome::Unreachable(e) => last_fetch_error = Some(e),
            }
        }

        match last_fetch_error {
            Some(error) if !any_page_fetched => Err(error),
            _ => {
                info!("{}: no product link after {} variant(s)", site.name(), variants.len());
                Err(ScrapeError::discovery_failed(site.name(), variants.len()))
            }
        }
    }

    async fn search(&self, site: &CompiledSite, variant: &str) -> SearchOutcome {
        let mut fetched_any = false;
        let mut last_error = None;

        for search_url in site.adapter.search_urls_for(variant, self.web_search_fallback) {
            let page = match self.fetcher.get(&search_url).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("{}: search page {} failed: {}", site.name(), search_url, e);
                    last_error = Some(e);
                    continue;
                }
            };
            fetched_any = true;

            let mode = if search_url.starts_with(WEB_SEARCH_ENDPOINT) {
                ScanMode::WebSearch
            } else {
                ScanMode::SiteSearch
            };
            if let Some(url) = scan(&page.body, site, mode) {
                return SearchOutcome::Found(url);
            }
            debug!("{}: no product link on {}", site.name(), search_url);
        }

        match last_error {
            Some(error) if !fetched_any => SearchOutcome::Unreachable(error),
            _ => SearchOutcome::NotFound,
        }
    }
}

// Html은 Send가 아니므로 await 사이에 들고 있지 않도록 분리
fn scan(body: &str, site: &CompiledSite, mode: ScanMode) -> Option<Url> {
    let document = Html::parse_document(body);
    find_product_link(&document, &site.adapter, &site.link_hints, mode)
}
