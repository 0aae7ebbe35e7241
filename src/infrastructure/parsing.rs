//! HTML parsing infrastructure for retailer pages
//!
//! Search result scanning (`link_finder`) and product page extraction
//! (`extractor`), built from smaller stages: structured metadata, selector
//! lookups, visible-text fallbacks and price normalization.

pub mod config;
pub mod extractor;
pub mod link_finder;
pub mod page_text;
pub mod price;
pub mod structured_data;

// Re-export public types
pub use config::ParsingConfig;
pub use extractor::{ExtractedProduct, ProductPageExtractor};
pub use link_finder::{find_product_link, CompiledHint, ScanMode};
pub use price::vn_number;

use scraper::Selector;
use tracing::warn;

use crate::domain::{ScrapeError, ScrapeResult};

/// Compile selector strings into Selector objects.
///
/// Any invalid selector is a configuration error naming `field`.
pub fn compile_selectors(selector_strings: &[String], field: &str) -> ScrapeResult<Vec<Selector>> {
    selector_strings
        .iter()
        .map(|selector_str| {
            Selector::parse(selector_str).map_err(|e| {
                warn!("Failed to compile selector '{}': {}", selector_str, e);
                ScrapeError::configuration(field, format!("invalid selector '{selector_str}': {e}"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_valid_selectors_in_order() {
        let selectors = compile_selectors(&[".price".to_string(), "h1".to_string()], "x").unwrap();
        assert_eq!(selectors.len(), 2);
    }

    #[test]
    fn one_bad_selector_fails_the_list() {
        let err = compile_selectors(&[".price".to_string(), "div[".to_string()], "sites.Pico.price_selectors")
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Configuration { ref field, .. } if field == "sites.Pico.price_selectors"));
    }
}
