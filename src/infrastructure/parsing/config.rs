//! Parsing configuration for product page extraction
//!
//! Site-independent selectors and vocabularies. Adapter-specific selectors
//! always run first; these are the fallbacks shared by every retailer.

use serde::{Deserialize, Serialize};

/// Main parsing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// Generic price selectors tried after the adapter's own
    pub generic_price_selectors: Vec<String>,

    /// Title fallbacks after the adapter's title selectors. A `content`
    /// attribute wins over element text (for `<meta>` tags).
    pub title_selectors: Vec<String>,

    /// Promotion vocabulary, matched case-insensitively in visible text
    pub promo_keywords: Vec<String>,

    /// Characters of trailing context kept after a promo keyword
    pub promo_context_chars: usize,

    /// Upper bound for promo text taken from an adapter promo selector
    pub promo_max_chars: usize,

    /// Nesting limit for the JSON-LD offers walk
    pub max_json_depth: usize,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            generic_price_selectors: [
                r#"[itemprop="price"]"#,
                "[data-price]",
                ".product-price",
                ".special-price",
                ".sale-price",
                ".price-sale",
                ".current-price",
                ".price",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            title_selectors: ["h1", r#"meta[property="og:title"]"#, "title"]
                .into_iter()
                .map(String::from)
                .collect(),
            // 긴 키워드가 먼저 와야 "quà tặng"이 "tặng"보다 우선 매칭됨
            promo_keywords: [
                "quà tặng",
                "tặng",
                "khuyến mãi",
                "ưu đãi",
                "giảm giá",
                "giảm",
                "gift",
                "discount",
                "offer",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            promo_context_chars: 100,
            promo_max_chars: 300,
            max_json_depth: 32,
        }
    }
}
