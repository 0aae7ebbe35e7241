//! Built-in retailer adapters and the site registry
//!
//! Adding a retailer means adding one `SiteAdapter` here (or in the config
//! file's `extra_sites`). Nothing else in the pipeline changes.

use scraper::Selector;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

use super::config::AppConfig;
use super::parsing::{compile_selectors, CompiledHint};
use crate::domain::{LinkHint, ScrapeError, ScrapeResult, SiteAdapter};
use crate::utils::site_key;

/// Retailer endpoints
pub mod retailers {
    pub const NGUYEN_KIM_BASE: &str = "https://www.nguyenkim.com";
    pub const NGUYEN_KIM_SEARCH: &str = "https://www.nguyenkim.com/tim-kiem.html?tu-khoa={query}";

    pub const PICO_BASE: &str = "https://pico.vn";
    pub const PICO_SEARCH: &str = "https://pico.vn/tim-kiem?q={query}";

    pub const DIEN_MAY_XANH_BASE: &str = "https://www.dienmayxanh.com";
    pub const DIEN_MAY_XANH_SEARCH: &str = "https://www.dienmayxanh.com/tim-kiem?key={query}";

    pub const MEDIAMART_BASE: &str = "https://mediamart.vn";
    pub const MEDIAMART_SEARCH: &str = "https://mediamart.vn/tag?key={query}";
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn nguyen_kim() -> SiteAdapter {
    SiteAdapter {
        name: "Nguyễn Kim".to_string(),
        base_url: retailers::NGUYEN_KIM_BASE.to_string(),
        search_urls: strings(&[retailers::NGUYEN_KIM_SEARCH]),
        web_search: true,
        link_hints: vec![
            LinkHint::Selector("a.product-title".to_string()),
            LinkHint::Selector(".product-item a.product-render".to_string()),
        ],
        price_selectors: strings(&[
            ".product-info__price .price-value",
            ".product_info_price_value-final",
            ".nk-price-final",
        ]),
        title_selectors: strings(&["h1.product_info_name", ".product-info__title h1"]),
        promo_selectors: strings(&[".product-promotion__content", ".nk-promotion-content"]),
        list_price_selectors: strings(&[".product-info__price .price-old", ".product_info_price_value-real"]),
    }
}

pub fn pico() -> SiteAdapter {
    SiteAdapter {
        name: "Pico".to_string(),
        base_url: retailers::PICO_BASE.to_string(),
        search_urls: strings(&[retailers::PICO_SEARCH]),
        web_search: true,
        link_hints: vec![
            LinkHint::Selector(".product-item a.product-name".to_string()),
            LinkHint::Selector(".product-item .product-image a".to_string()),
        ],
        price_selectors: strings(&[".product-detail span.price", "span.price"]),
        title_selectors: strings(&["h1.product-name", "h1.product-title"]),
        promo_selectors: strings(&["div.product-promotion-content", ".promotion-list"]),
        list_price_selectors: strings(&[".product-detail .price-old", "del.price"]),
    }
}

pub fn dien_may_xanh() -> SiteAdapter {
    SiteAdapter {
        name: "Điện Máy Xanh".to_string(),
        base_url: retailers::DIEN_MAY_XANH_BASE.to_string(),
        search_urls: strings(&[retailers::DIEN_MAY_XANH_SEARCH]),
        web_search: false,
        link_hints: vec![
            LinkHint::Selector("ul.listproduct li.item a.main-contain".to_string()),
            LinkHint::Selector(".listproduct .item > a".to_string()),
        ],
        price_selectors: strings(&[".box-price-present", ".box-price .price-present", ".bs_price strong"]),
        title_selectors: strings(&["h1"]),
        promo_selectors: strings(&[".block__promo .pr-content", ".box-promotion"]),
        list_price_selectors: strings(&[".box-price-old", ".box-price .price-old"]),
    }
}

pub fn mediamart() -> SiteAdapter {
    SiteAdapter {
        name: "MediaMart".to_string(),
        base_url: retailers::MEDIAMART_BASE.to_string(),
        search_urls: strings(&[retailers::MEDIAMART_SEARCH]),
        web_search: false,
        link_hints: vec![
            LinkHint::Selector(".product-list .card a.product-item".to_string()),
            LinkHint::Selector("p.product-name a".to_string()),
        ],
        price_selectors: strings(&[".pdetail-price-box .pdetail-price", ".product-price"]),
        title_selectors: strings(&[".pdetail-name h1", "h1"]),
        promo_selectors: strings(&[".pdetail-promotion", ".pdetail-promotion-content"]),
        list_price_selectors: strings(&[".pdetail-price-box .pdetail-price-old", ".product-price-regular"]),
    }
}

/// Built-in retailers in registration order
pub fn builtin_adapters() -> Vec<SiteAdapter> {
    vec![nguyen_kim(), pico(), dien_may_xanh(), mediamart()]
}

/// An adapter with every selector parsed, ready for scanning and extraction
#[derive(Debug, Clone)]
pub struct CompiledSite {
    pub adapter: SiteAdapter,
    pub link_hints: Vec<CompiledHint>,
    pub price: Vec<Selector>,
    pub title: Vec<Selector>,
    pub promo: Vec<Selector>,
    pub list_price: Vec<Selector>,
}

impl CompiledSite {
    /// Validate and compile. Any failure is a startup configuration error.
    pub fn compile(adapter: SiteAdapter) -> ScrapeResult<Self> {
        adapter.validate()?;
        let field = |name: &str| format!("sites.{}.{name}", adapter.name);

        let link_hints = adapter
            .link_hints
            .iter()
            .map(|hint| CompiledHint::compile(hint, &field("link_hints")))
            .collect::<ScrapeResult<Vec<_>>>()?;

        Ok(Self {
            link_hints,
            price: compile_selectors(&adapter.price_selectors, &field("price_selectors"))?,
            title: compile_selectors(&adapter.title_selectors, &field("title_selectors"))?,
            promo: compile_selectors(&adapter.promo_selectors, &field("promo_selectors"))?,
            list_price: compile_selectors(&adapter.list_price_selectors, &field("list_price_selectors"))?,
            adapter,
        })
    }

    pub fn name(&self) -> &str {
        &self.adapter.name
    }
}

/// Read-only registry of compiled adapters, in registration order
#[derive(Debug, Clone)]
pub struct SiteRegistry {
    sites: Vec<Arc<CompiledSite>>,
}

impl SiteRegistry {
    pub fn new(adapters: Vec<SiteAdapter>) -> ScrapeResult<Self> {
        if adapters.is_empty() {
            return Err(ScrapeError::configuration("sites", "no retailer adapters registered"));
        }

        let mut seen = HashSet::new();
        let mut sites = Vec::with_capacity(adapters.len());
        for adapter in adapters {
            if !seen.insert(site_key(&adapter.name)) {
                return Err(ScrapeError::configuration(
                    &format!("sites.{}", adapter.name),
                    "duplicate site name",
                ));
            }
            sites.push(Arc::new(CompiledSite::compile(adapter)?));
        }

        info!(
            "Site registry ready: {}",
            sites.iter().map(|s| s.name()).collect::<Vec<_>>().join(", ")
        );
        Ok(Self { sites })
    }

    /// Built-in retailers only
    pub fn builtin() -> ScrapeResult<Self> {
        Self::new(builtin_adapters())
    }

    /// Built-in retailers followed by the config file's `extra_sites`
    pub fn from_config(config: &AppConfig) -> ScrapeResult<Self> {
        let mut adapters = builtin_adapters();
        adapters.extend(config.extra_sites.iter().cloned());
        Self::new(adapters)
    }

    pub fn sites(&self) -> &[Arc<CompiledSite>] {
        &self.sites
    }

    /// Case-insensitive lookup by display name
    pub fn find(&self, name: &str) -> Option<&Arc<CompiledSite>> {
        let wanted = site_key(name);
        self.sites.iter().find(|site| site_key(site.name()) == wanted)
    }

    pub fn names(&self) -> Vec<&str> {
        self.sites.iter().map(|site| site.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_compiles_in_order() {
        let registry = SiteRegistry::builtin().unwrap();
        assert_eq!(registry.names(), vec!["Nguyễn Kim", "Pico", "Điện Máy Xanh", "MediaMart"]);
    }

    #[test]
    fn lookup_ignores_case() {
        let registry = SiteRegistry::builtin().unwrap();
        assert_eq!(registry.find("mediamart").unwrap().name(), "MediaMart");
        assert_eq!(registry.find("NGUYỄN KIM").unwrap().name(), "Nguyễn Kim");
        assert!(registry.find("Lazada").is_none());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = SiteRegistry::new(vec![pico(), pico()]).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn unparsable_selector_is_fatal() {
        let broken = SiteAdapter {
            price_selectors: vec!["span.price[".to_string()],
            ..pico()
        };
        let err = SiteRegistry::new(vec![broken]).unwrap_err();
        assert!(err.to_string().contains("sites.Pico.price_selectors"));
    }

    #[test]
    fn empty_registry_is_rejected() {
        assert!(SiteRegistry::new(Vec::new()).is_err());
    }

    #[test]
    fn extra_sites_follow_builtins() {
        let mut config = AppConfig::default();
        config.extra_sites.push(SiteAdapter {
            name: "Chợ Lớn".to_string(),
            base_url: "https://dienmaycholon.vn".to_string(),
            ..pico()
        });
        let registry = SiteRegistry::from_config(&config).unwrap();
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.sites()[4].name(), "Chợ Lớn");
    }
}
