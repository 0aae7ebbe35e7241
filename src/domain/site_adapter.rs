//! Retailer adapter description
//!
//! An adapter is pure data: URL templates, link hints and selector lists.
//! One extraction routine consults it, so per-site customization never
//! needs its own code path.

use serde::{Deserialize, Serialize};
use url::Url;

use super::errors::{ScrapeError, ScrapeResult};

/// Placeholder substituted with the percent-encoded query variant
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// General web search scoped to one domain with `site:`
pub const WEB_SEARCH_ENDPOINT: &str = "https://www.google.com/search";

/// How a product-detail link is recognized among search result anchors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "pattern", rename_all = "snake_case")]
pub enum LinkHint {
    /// CSS selector the anchor element itself must match
    Selector(String),
    /// Substring the raw href must contain
    UrlContains(String),
}

impl LinkHint {
    pub fn pattern(&self) -> &str {
        match self {
            Self::Selector(p) | Self::UrlContains(p) => p,
        }
    }
}

/// Per-retailer configuration bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteAdapter {
    /// Display name, also the key for per-site lookups
    pub name: String,

    /// Base URL used to resolve relative hrefs
    pub base_url: String,

    /// Site-local search endpoints, each containing `{query}`
    pub search_urls: Vec<String>,

    /// Also try a scoped general web search after the site endpoints
    #[serde(default)]
    pub web_search: bool,

    /// Product link recognition, any hint may match
    pub link_hints: Vec<LinkHint>,

    /// Site-specific price selectors, consulted before the generic ones
    pub price_selectors: Vec<String>,

    #[serde(default)]
    pub title_selectors: Vec<String>,

    #[serde(default)]
    pub promo_selectors: Vec<String>,

    /// Struck-through list price shown next to a sale price
    #[serde(default)]
    pub list_price_selectors: Vec<String>,
}

impl SiteAdapter {
    /// Host of the base URL without a leading `www.`
    pub fn domain(&self) -> Option<String> {
        let url = Url::parse(&self.base_url).ok()?;
        let host = url.host_str()?;
        Some(host.strip_prefix("www.").unwrap_or(host).to_string())
    }

    /// Search URLs for one query variant, site endpoints first.
    pub fn search_urls_for(&self, variant: &str, include_web_search: bool) -> Vec<String> {
        let encoded = encode_query(variant);
        let mut urls: Vec<String> = self
            .search_urls
            .iter()
            .map(|template| template.replace(QUERY_PLACEHOLDER, &encoded))
            .collect();

        if include_web_search || self.web_search {
            if let Some(domain) = self.domain() {
                urls.push(format!("{WEB_SEARCH_ENDPOINT}?q={encoded}+site:{domain}"));
            }
        }

        urls
    }

    /// Resolve an href (absolute or relative) against the base URL.
    pub fn resolve(&self, href: &str) -> Option<Url> {
        let base = Url::parse(&self.base_url).ok()?;
        let resolved = base.join(href.trim()).ok()?;
        matches!(resolved.scheme(), "http" | "https").then_some(resolved)
    }

    /// Whether a URL points into this retailer's domain (subdomains included)
    pub fn owns(&self, url: &Url) -> bool {
        let (Some(domain), Some(host)) = (self.domain(), url.host_str()) else {
            return false;
        };
        host == domain || host.ends_with(&format!(".{domain}"))
    }

    /// Structural validation. Selector syntax is checked when the registry
    /// compiles the adapter.
    pub fn validate(&self) -> ScrapeResult<()> {
        let field = |name: &str| format!("sites.{}.{name}", self.name);

        if self.name.trim().is_empty() {
            return Err(ScrapeError::configuration("sites.name", "adapter name is empty"));
        }

        let base = Url::parse(&self.base_url)
            .map_err(|e| ScrapeError::configuration(&field("base_url"), e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ScrapeError::configuration(
                &field("base_url"),
                format!("unsupported scheme '{}'", base.scheme()),
            ));
        }

        if self.search_urls.is_empty() && !self.web_search {
            return Err(ScrapeError::configuration(&field("search_urls"), "no search endpoints"));
        }
        if let Some(bad) = self.search_urls.iter().find(|t| !t.contains(QUERY_PLACEHOLDER)) {
            return Err(ScrapeError::configuration(
                &field("search_urls"),
                format!("template '{bad}' lacks {QUERY_PLACEHOLDER}"),
            ));
        }

        if self.link_hints.is_empty() {
            return Err(ScrapeError::configuration(&field("link_hints"), "no product link hints"));
        }
        if self.link_hints.iter().any(|h| h.pattern().trim().is_empty()) {
            return Err(ScrapeError::configuration(&field("link_hints"), "empty hint pattern"));
        }

        if self.price_selectors.is_empty() {
            return Err(ScrapeError::configuration(&field("price_selectors"), "no price selectors"));
        }

        Ok(())
    }
}

fn encode_query(variant: &str) -> String {
    url::form_urlencoded::byte_serialize(variant.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> SiteAdapter {
        SiteAdapter {
            name: "Pico".to_string(),
            base_url: "https://pico.vn".to_string(),
            search_urls: vec!["https://pico.vn/tim-kiem?q={query}".to_string()],
            web_search: false,
            link_hints: vec![LinkHint::UrlContains("/p/".to_string())],
            price_selectors: vec![".price".to_string()],
            title_selectors: Vec::new(),
            promo_selectors: Vec::new(),
            list_price_selectors: Vec::new(),
        }
    }

    #[test]
    fn search_urls_encode_the_variant() {
        let urls = adapter().search_urls_for("Nồi AC 381", false);
        assert_eq!(urls, vec!["https://pico.vn/tim-kiem?q=N%E1%BB%93i+AC+381"]);
    }

    #[test]
    fn web_search_is_appended_last_and_scoped() {
        let urls = adapter().search_urls_for("AC-381", true);
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[1], "https://www.google.com/search?q=AC-381+site:pico.vn");
    }

    #[test]
    fn resolves_relative_and_absolute_hrefs() {
        let site = adapter();
        assert_eq!(
            site.resolve("/p/noi-com-ac-381").unwrap().as_str(),
            "https://pico.vn/p/noi-com-ac-381"
        );
        assert_eq!(
            site.resolve("https://cdn.pico.vn/p/x").unwrap().as_str(),
            "https://cdn.pico.vn/p/x"
        );
        assert!(site.resolve("javascript:void(0)").is_none());
    }

    #[test]
    fn owns_matches_domain_and_subdomains() {
        let site = SiteAdapter {
            base_url: "https://www.nguyenkim.com".to_string(),
            ..adapter()
        };
        assert!(site.owns(&Url::parse("https://www.nguyenkim.com/tivi.html").unwrap()));
        assert!(site.owns(&Url::parse("https://nguyenkim.com/tivi.html").unwrap()));
        assert!(!site.owns(&Url::parse("https://notnguyenkim.com/x").unwrap()));
    }

    #[test]
    fn validation_rejects_missing_selectors() {
        let site = SiteAdapter {
            price_selectors: Vec::new(),
            ..adapter()
        };
        let err = site.validate().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("price_selectors"));
    }

    #[test]
    fn validation_rejects_template_without_placeholder() {
        let site = SiteAdapter {
            search_urls: vec!["https://pico.vn/tim-kiem".to_string()],
            ..adapter()
        };
        assert!(site.validate().is_err());
        assert!(adapter().validate().is_ok());
    }

    #[test]
    fn link_hints_round_trip_through_json() {
        let json = serde_json::to_string(&LinkHint::Selector("a.product".to_string())).unwrap();
        assert_eq!(json, r#"{"kind":"selector","pattern":"a.product"}"#);
    }
}
