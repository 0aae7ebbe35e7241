//! Price aggregation across every registered retailer
//!
//! Each site is one unit of work: discovery, fetch, extract. Units run as a
//! bounded pool and their results come back in registration order. A site's
//! failure only ever shows up as a note on that site's result.

use futures::stream::{self, StreamExt};
use scraper::Html;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::product_locator::ProductLocator;
use crate::domain::{FetchedPage, PageFetcher, PriceResult, Query, ResultSet, ScrapeError, ScrapeResult};
use crate::infrastructure::config::{AppConfig, ScraperConfig};
use crate::infrastructure::http_client::HttpClient;
use crate::infrastructure::parsing::{ExtractedProduct, ProductPageExtractor};
use crate::infrastructure::sites::{CompiledSite, SiteRegistry};

/// Multi-retailer price lookup
pub struct PriceScraper {
    registry: Arc<SiteRegistry>,
    fetcher: Arc<dyn PageFetcher>,
    locator: ProductLocator,
    extractor: Arc<ProductPageExtractor>,
    config: ScraperConfig,
}

impl PriceScraper {
    pub fn new(
        registry: Arc<SiteRegistry>,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<ProductPageExtractor>,
        config: ScraperConfig,
    ) -> Self {
        let locator = ProductLocator::new(fetcher.clone(), config.web_search_fallback);
        Self {
            registry,
            fetcher,
            locator,
            extractor,
            config,
        }
    }

    /// Wire the real HTTP client, registry and extractor from configuration.
    /// Any error here is a startup configuration error.
    pub fn from_config(config: &AppConfig) -> ScrapeResult<Self> {
        config.validate()?;
        let registry = Arc::new(SiteRegistry::from_config(config)?);
        let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpClient::new(config.fetcher.clone())?);
        let extractor = Arc::new(ProductPageExtractor::with_config(&config.parsing)?);
        Ok(Self::new(registry, fetcher, extractor, config.scraper.clone()))
    }

    pub fn registry(&self) -> &SiteRegistry {
        &self.registry
    }

    /// One result per registered site, in registration order.
    ///
    /// Fails only for an empty query.
    pub async fn scrape_all(&self, raw_query: &str) -> ScrapeResult<ResultSet> {
        let query = Query::parse(raw_query)?;
        let variants = query.variants();
        let concurrency = self.config.effective_concurrency(self.registry.len());

        info!(
            "🛒 Scraping '{}' on {} site(s), {} variant(s), concurrency {}",
            query,
            self.registry.len(),
            variants.len(),
            concurrency
        );

        // buffered는 완료 순서가 아니라 입력 순서를 유지
        let results: Vec<PriceResult> = stream::iter(self.registry.sites())
            .map(|site| self.scrape_site(site, &query, &variants))
            .buffered(concurrency)
            .collect()
            .await;

        let set = ResultSet::new(query.as_str(), results);
        info!("Finished '{}': {}/{} site(s) priced", query, set.priced().count(), set.len());
        Ok(set)
    }

    /// Single-site lookup; `None` for an unknown site name.
    pub async fn get_price(&self, site_name: &str, query: &Query) -> Option<PriceResult> {
        let site = self.registry.find(site_name)?;
        let variants = query.variants();
        Some(self.scrape_site(site, query, &variants).await)
    }

    /// Whole unit of work for one site, folded into a `PriceResult`.
    async fn scrape_site(&self, site: &Arc<CompiledSite>, query: &Query, variants: &[String]) -> PriceResult {
        let work = self.run_site(site, query, variants);

        let result = match self.config.site_timeout_secs {
            Some(seconds) => match tokio::time::timeout(Duration::from_secs(seconds), work).await {
                Ok(result) => result,
                Err(_) => Err(SiteFailure {
                    error: ScrapeError::Timeout {
                        site: site.name().to_string(),
                        seconds,
                    },
                    url: None,
                }),
            },
            None => work.await,
        };

        match result {
            Ok(price_result) => price_result,
            Err(failure) => {
                warn!("❌ {}: {}", site.name(), failure.error);
                let result = PriceResult::failed(site.name(), &failure.error);
                match failure.url {
                    Some(url) => result.with_url(url),
                    None => result,
                }
            }
        }
    }

    async fn run_site(
        &self,
        site: &CompiledSite,
        query: &Query,
        variants: &[String],
    ) -> Result<PriceResult, SiteFailure> {
        let located = self.locator.locate(site, variants).await.map_err(SiteFailure::from)?;
        let product_url = located.url.to_string();

        let page = self.fetcher.get(&product_url).await.map_err(|error| SiteFailure {
            error,
            url: Some(product_url.clone()),
        })?;

        let product = self.extract(&page, site, query);
        Ok(build_result(site, &page, product))
    }

    // Html은 Send가 아니므로 동기 함수 안에서만 사용
    fn extract(&self, page: &FetchedPage, site: &CompiledSite, query: &Query) -> ExtractedProduct {
        let document = Html::parse_document(&page.body);
        self.extractor.extract(&document, site, query.as_str())
    }
}

/// A site-level error with the product URL when one was known
struct SiteFailure {
    error: ScrapeError,
    url: Option<String>,
}

impl From<ScrapeError> for SiteFailure {
    fn from(error: ScrapeError) -> Self {
        Self { error, url: None }
    }
}

fn build_result(site: &CompiledSite, page: &FetchedPage, product: ExtractedProduct) -> PriceResult {
    let mut result = PriceResult::new(site.name()).with_url(page.url.clone());
    result.title = Some(product.title);
    result.http_status = Some(page.status);

    let Some(price) = product.price else {
        let error = ScrapeError::extraction_incomplete(site.name(), &page.url);
        warn!("❌ {}: {}", site.name(), error);
        result.promo = product.promo;
        return result.with_note(error.note());
    };

    info!(
        "✅ {}: {} ({})",
        site.name(),
        price,
        product.price_source.map_or_else(|| "unknown".to_string(), |s| s.to_string())
    );

    result.price = Some(price);
    result.price_source = product.price_source;
    result.original_price = product.original_price;
    result.promo = product.promo;

    if page.is_degraded() {
        warn!("{}: price read from HTTP {} page", site.name(), page.status);
        result = result.with_note(format!(
            "Low confidence: read from an HTTP {} response that may be a bot-challenge page",
            page.status
        ));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> CompiledSite {
        CompiledSite::compile(crate::infrastructure::sites::pico()).unwrap()
    }

    fn product(price: Option<&str>) -> ExtractedProduct {
        ExtractedProduct {
            title: "Nồi cơm điện AC-381".to_string(),
            price: price.map(String::from),
            price_source: price.map(|_| crate::domain::PriceSource::Selector),
            original_price: None,
            promo: Some("Tặng bình nước".to_string()),
        }
    }

    #[test]
    fn priced_page_has_no_note() {
        let page = FetchedPage::new("https://pico.vn/p/ac-381", 200, "");
        let result = build_result(&site(), &page, product(Some("1.290.000 ₫")));
        assert_eq!(result.price.as_deref(), Some("1.290.000 ₫"));
        assert_eq!(result.url.as_deref(), Some("https://pico.vn/p/ac-381"));
        assert!(result.note.is_none());
    }

    #[test]
    fn degraded_page_gets_low_confidence_note() {
        let page = FetchedPage::new("https://pico.vn/p/ac-381", 403, "");
        let result = build_result(&site(), &page, product(Some("1.290.000 ₫")));
        assert!(result.is_priced());
        assert!(result.note.unwrap().contains("Low confidence"));
    }

    #[test]
    fn unpriced_page_keeps_title_and_explains() {
        let page = FetchedPage::new("https://pico.vn/p/ac-381", 200, "");
        let result = build_result(&site(), &page, product(None));
        assert!(!result.is_priced());
        assert_eq!(result.title.as_deref(), Some("Nồi cơm điện AC-381"));
        assert!(result.note.unwrap().contains("client-side"));
    }
}
