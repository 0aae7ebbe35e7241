//! Product page extraction
//!
//! One routine for every retailer. The site's compiled adapter supplies the
//! site-specific selectors; everything else is shared:
//!
//! 1. structured data (JSON-LD offers, then Open Graph price tags)
//! 2. adapter price selectors, then generic price selectors
//! 3. the first currency-marked amount in the visible page text
//!
//! The first stage producing a normalizable price wins.

use once_cell::unsync::OnceCell;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::compile_selectors;
use super::config::ParsingConfig;
use super::page_text::{element_text, visible_text, PromoMatcher};
use super::price::{find_currency_amount, vn_number};
use super::structured_data::structured_prices;
use crate::domain::{PriceSource, ScrapeError, ScrapeResult};
use crate::infrastructure::sites::CompiledSite;
use crate::utils::{collapse_whitespace, truncate_chars};

/// Attributes holding a machine-readable price, preferred over element text
const PRICE_ATTRIBUTES: [&str; 2] = ["content", "data-price"];

/// Everything read off one product page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedProduct {
    /// Never empty; falls back to the query text
    pub title: String,
    pub price: Option<String>,
    pub price_source: Option<PriceSource>,
    /// List price, only when it differs from `price`
    pub original_price: Option<String>,
    pub promo: Option<String>,
}

/// Parser for retailer product detail pages
#[derive(Debug, Clone)]
pub struct ProductPageExtractor {
    generic_price_selectors: Vec<Selector>,
    title_selectors: Vec<Selector>,
    promo_matcher: PromoMatcher,
    promo_max_chars: usize,
    max_json_depth: usize,
}

impl ProductPageExtractor {
    /// Create an extractor with the default configuration
    pub fn new() -> ScrapeResult<Self> {
        Self::with_config(&ParsingConfig::default())
    }

    pub fn with_config(config: &ParsingConfig) -> ScrapeResult<Self> {
        let promo_matcher = PromoMatcher::new(&config.promo_keywords, config.promo_context_chars)
            .map_err(|e| ScrapeError::configuration("parsing.promo_keywords", e.to_string()))?;

        Ok(Self {
            generic_price_selectors: compile_selectors(
                &config.generic_price_selectors,
                "parsing.generic_price_selectors",
            )?,
            title_selectors: compile_selectors(&config.title_selectors, "parsing.title_selectors")?,
            promo_matcher,
            promo_max_chars: config.promo_max_chars,
            max_json_depth: config.max_json_depth,
        })
    }

    /// Parse `html` and extract
    pub fn extract_html(&self, html: &str, site: &CompiledSite, query: &str) -> ExtractedProduct {
        let document = Html::parse_document(html);
        self.extract(&document, site, query)
    }

    pub fn extract(&self, document: &Html, site: &CompiledSite, query: &str) -> ExtractedProduct {
        // 텍스트 폴백이 필요할 때만 한 번 계산
        let page_text = OnceCell::new();
        let text = || page_text.get_or_init(|| visible_text(document)).as_str();

        let (price, price_source) = match self.structured_price(document) {
            Some(price) => (Some(price), Some(PriceSource::StructuredData)),
            None => match self.selector_price(document, site) {
                Some(price) => (Some(price), Some(PriceSource::Selector)),
                None => match find_currency_amount(text()) {
                    Some(price) => (Some(price), Some(PriceSource::PageText)),
                    None => (None, None),
                },
            },
        };

        let original_price = first_normalized(document, &site.list_price)
            .filter(|list| price.as_ref() != Some(list));

        let promo = self
            .promo_from_selectors(document, site)
            .or_else(|| self.promo_matcher.find(text()));

        let title = self.title(document, site, query);

        debug!(
            "Extracted {} page: price={:?} source={:?} promo={}",
            site.name(),
            price,
            price_source,
            promo.is_some()
        );

        ExtractedProduct {
            title,
            price,
            price_source,
            original_price,
            promo,
        }
    }

    fn structured_price(&self, document: &Html) -> Option<String> {
        structured_prices(document, self.max_json_depth)
            .iter()
            .find_map(|raw| vn_number(raw))
    }

    /// Adapter selectors first, then generic ones; first unique candidate wins.
    fn selector_price(&self, document: &Html, site: &CompiledSite) -> Option<String> {
        let mut candidates: Vec<String> = Vec::new();
        for selector in site.price.iter().chain(&self.generic_price_selectors) {
            for element in document.select(selector) {
                if let Some(price) = vn_number(&price_text(&element)) {
                    if !candidates.contains(&price) {
                        candidates.push(price);
                    }
                }
            }
        }

        if candidates.len() > 1 {
            debug!("{} price candidates on {} page: {:?}", candidates.len(), site.name(), candidates);
        }
        candidates.into_iter().next()
    }

    fn title(&self, document: &Html, site: &CompiledSite, query: &str) -> String {
        site.title
            .iter()
            .chain(&self.title_selectors)
            .flat_map(|selector| document.select(selector))
            .map(|element| content_or_text(&element))
            .find(|title| !title.is_empty())
            .unwrap_or_else(|| collapse_whitespace(query))
    }

    fn promo_from_selectors(&self, document: &Html, site: &CompiledSite) -> Option<String> {
        site.promo
            .iter()
            .flat_map(|selector| document.select(selector))
            .map(|element| element_text(&element))
            .find(|promo| !promo.is_empty())
            .map(|promo| truncate_chars(&promo, self.promo_max_chars).trim_end().to_string())
    }
}

fn first_normalized(document: &Html, selectors: &[Selector]) -> Option<String> {
    selectors
        .iter()
        .flat_map(|selector| document.select(selector))
        .find_map(|element| vn_number(&price_text(&element)))
}

fn price_text(element: &ElementRef<'_>) -> String {
    PRICE_ATTRIBUTES
        .iter()
        .find_map(|attr| element.value().attr(attr))
        .map(str::to_string)
        .unwrap_or_else(|| element_text(element))
}

fn content_or_text(element: &ElementRef<'_>) -> String {
    match element.value().attr("content") {
        Some(content) => collapse_whitespace(content),
        None => element_text(element),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LinkHint, SiteAdapter};

    fn site() -> CompiledSite {
        CompiledSite::compile(SiteAdapter {
            name: "Nguyễn Kim".to_string(),
            base_url: "https://www.nguyenkim.com".to_string(),
            search_urls: vec!["https://www.nguyenkim.com/tim-kiem.html?tu-khoa={query}".to_string()],
            web_search: false,
            link_hints: vec![LinkHint::Selector("a.product-title".to_string())],
            price_selectors: vec![".product-info__price .price-value".to_string()],
            title_selectors: vec!["h1.product_info_name".to_string()],
            promo_selectors: vec![".product-promotion__content".to_string()],
            list_price_selectors: vec![".product-info__price .price-old".to_string()],
        })
        .unwrap()
    }

    fn extract(html: &str) -> ExtractedProduct {
        ProductPageExtractor::new().unwrap().extract_html(html, &site(), "Tivi LG 65UQ7550")
    }

    #[test]
    fn structured_data_wins_over_selectors() {
        let product = extract(
            r#"<html><head><script type="application/ld+json">{"@type":"Product","offers":{"price":"12990000"}}</script></head>
            <body><div class="product-info__price"><span class="price-value">11.490.000đ</span></div></body></html>"#,
        );
        assert_eq!(product.price.as_deref(), Some("12.990.000 ₫"));
        assert_eq!(product.price_source, Some(PriceSource::StructuredData));
    }

    #[test]
    fn adapter_selectors_precede_generic_ones() {
        let product = extract(
            r#"<body><span class="price">1.990.000đ</span>
            <div class="product-info__price"><span class="price-value">11.490.000đ</span>
            <span class="price-old">13.990.000đ</span></div></body>"#,
        );
        assert_eq!(product.price.as_deref(), Some("11.490.000 ₫"));
        assert_eq!(product.price_source, Some(PriceSource::Selector));
        assert_eq!(product.original_price.as_deref(), Some("13.990.000 ₫"));
    }

    #[test]
    fn price_attributes_beat_element_text() {
        let product = extract(r#"<body><meta itemprop="price" content="8490000"><div data-price="1">Liên hệ</div></body>"#);
        assert_eq!(product.price.as_deref(), Some("8.490.000 ₫"));
    }

    #[test]
    fn visible_text_is_the_last_resort() {
        let product = extract(
            r#"<body><script>var price = "99.999.999đ";</script><p>Giá bán: 7.290.000 ₫ (đã gồm VAT)</p></body>"#,
        );
        assert_eq!(product.price.as_deref(), Some("7.290.000 ₫"));
        assert_eq!(product.price_source, Some(PriceSource::PageText));
    }

    #[test]
    fn no_price_anywhere() {
        let product = extract("<body><h1>Tivi LG</h1><p>Liên hệ để biết giá</p></body>");
        assert!(product.price.is_none());
        assert!(product.price_source.is_none());
        assert_eq!(product.title, "Tivi LG");
    }

    #[test]
    fn review_counts_are_not_prices() {
        let product = extract("<body><p>12.345 đánh giá</p><p>Liên hệ để biết giá</p></body>");
        assert!(product.price.is_none());
    }

    #[test]
    fn main_entity_offer_precedes_related_product() {
        let product = extract(
            r#"<head><script type="application/ld+json">{"@type":"WebPage",
            "mainEntity":{"@type":"Product","offers":{"price":"12990000"}},
            "hasPart":{"@type":"Product","offers":{"price":"1990000"}}}</script></head><body></body>"#,
        );
        assert_eq!(product.price.as_deref(), Some("12.990.000 ₫"));
    }

    #[test]
    fn list_price_equal_to_price_is_dropped() {
        let product = extract(
            r#"<body><div class="product-info__price"><span class="price-value">5.000.000đ</span>
            <span class="price-old">5.000.000đ</span></div></body>"#,
        );
        assert!(product.original_price.is_none());
    }

    #[test]
    fn title_fallback_chain() {
        assert_eq!(
            extract(r#"<body><h1 class="product_info_name"> Tivi  LG 65" </h1><h1>Other</h1></body>"#).title,
            r#"Tivi LG 65""#
        );
        assert_eq!(
            extract(r#"<head><meta property="og:title" content="OG title"><title>Doc title</title></head>"#).title,
            "OG title"
        );
        assert_eq!(extract("<head><title>Doc title</title></head>").title, "Doc title");
        assert_eq!(extract("<body></body>").title, "Tivi LG 65UQ7550");
    }

    #[test]
    fn promo_selector_precedes_keyword_scan() {
        let product = extract(
            r#"<body><p>Khuyến mãi tháng 10</p>
            <div class="product-promotion__content"> Tặng   phiếu mua hàng 500.000đ </div></body>"#,
        );
        assert_eq!(product.promo.as_deref(), Some("Tặng phiếu mua hàng 500.000đ"));
    }

    #[test]
    fn promo_keyword_scan_in_visible_text() {
        let product = extract("<body><p>Ưu đãi: giảm thêm 5% khi thanh toán online</p></body>");
        assert_eq!(product.promo.as_deref(), Some("Ưu đãi: giảm thêm 5% khi thanh toán online"));
    }

    #[test]
    fn invalid_generic_selector_is_configuration_error() {
        let config = ParsingConfig {
            generic_price_selectors: vec!["[[".to_string()],
            ..ParsingConfig::default()
        };
        assert!(ProductPageExtractor::with_config(&config).unwrap_err().is_fatal());
    }
}
