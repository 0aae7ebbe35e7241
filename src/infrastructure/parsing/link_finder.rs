//! Product link discovery on search result pages

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::domain::{LinkHint, ScrapeError, ScrapeResult, SiteAdapter};

static ANCHORS: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("anchor selector is valid"));

/// Base for resolving web search redirect wrappers such as `/url?q=...`
const WEB_SEARCH_BASE: &str = "https://www.google.com/";

/// Which kind of result page is being scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// The retailer's own search page: adapter link hints decide
    SiteSearch,
    /// A scoped web search page: any link into the retailer's domain
    WebSearch,
}

/// A `LinkHint` with its selector parsed
#[derive(Debug, Clone)]
pub enum CompiledHint {
    Selector(Selector),
    UrlContains(String),
}

impl CompiledHint {
    pub fn compile(hint: &LinkHint, field: &str) -> ScrapeResult<Self> {
        match hint {
            LinkHint::Selector(css) => Selector::parse(css)
                .map(Self::Selector)
                .map_err(|e| ScrapeError::configuration(field, format!("invalid selector '{css}': {e}"))),
            LinkHint::UrlContains(fragment) => Ok(Self::UrlContains(fragment.clone())),
        }
    }

    fn matches(&self, anchor: &ElementRef<'_>, href: &str) -> bool {
        match self {
            Self::Selector(selector) => selector.matches(anchor),
            Self::UrlContains(fragment) => href.contains(fragment.as_str()),
        }
    }
}

/// First product link in document order, resolved to an absolute URL.
///
/// Returns `None` when nothing matches; a search page without a product link
/// is an ordinary outcome, not an error.
pub fn find_product_link(
    document: &Html,
    adapter: &SiteAdapter,
    hints: &[CompiledHint],
    mode: ScanMode,
) -> Option<Url> {
    for anchor in document.select(&ANCHORS) {
        let Some(raw) = anchor.value().attr("href") else {
            continue;
        };
        let href = raw.trim();
        if is_non_navigational(href) {
            continue;
        }

        let candidate = match mode {
            ScanMode::SiteSearch => {
                if !hints.iter().any(|hint| hint.matches(&anchor, href)) {
                    continue;
                }
                href.to_string()
            }
            // 상대 경로는 검색 엔진 자체 링크이므로 절대 URL만 후보
            ScanMode::WebSearch => match unwrap_redirect(href) {
                Some(target) => target,
                None if Url::parse(href).is_ok() => href.to_string(),
                None => continue,
            },
        };

        let Some(url) = adapter.resolve(&candidate) else {
            continue;
        };
        if !adapter.owns(&url) {
            debug!("Skipping off-site link {} for {}", url, adapter.name);
            continue;
        }
        if mode == ScanMode::WebSearch && url.path().len() <= 1 {
            continue;
        }

        debug!("Product link for {}: {}", adapter.name, url);
        return Some(url);
    }

    None
}

fn is_non_navigational(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    href.is_empty()
        || href.starts_with('#')
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
}

/// Target of a `/url?q=<target>&...` redirect wrapper
pub fn unwrap_redirect(href: &str) -> Option<String> {
    let base = Url::parse(WEB_SEARCH_BASE).ok()?;
    let url = base.join(href).ok()?;
    if url.path() != "/url" {
        return None;
    }
    url.query_pairs()
        .find(|(key, _)| key == "q" || key == "url")
        .map(|(_, target)| target.into_owned())
        .filter(|target| target.starts_with("http"))
}
