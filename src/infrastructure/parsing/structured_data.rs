//! Structured product metadata: JSON-LD offers and Open Graph price tags
//!
//! Retailers embed schema.org `Product` markup for search engines, and bot
//! challenge pages frequently keep it. It is the most reliable price source
//! when present.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

static LD_JSON: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("ld+json selector is valid")
});

static OG_PRICE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[property="product:price:amount"], meta[property="og:price:amount"]"#)
        .expect("og price selector is valid")
});

/// Offer keys in preference order. `lowPrice` covers `AggregateOffer`.
const PRICE_KEYS: [&str; 2] = ["price", "lowPrice"];

/// Raw structured prices in document order: JSON-LD offers first, then
/// Open Graph tags. Values are not normalized.
pub fn structured_prices(document: &Html, max_depth: usize) -> Vec<String> {
    let mut prices = Vec::new();
    for block in json_ld_blocks(document) {
        collect_offer_prices(&block, max_depth, &mut prices);
    }
    prices.extend(open_graph_prices(document));
    prices
}

/// Every JSON-LD script block that parses as JSON
pub fn json_ld_blocks(document: &Html) -> Vec<Value> {
    document
        .select(&LD_JSON)
        .filter_map(|script| {
            let raw: String = script.text().collect();
            let cleaned = strip_comment_wrappers(&raw);
            match serde_json::from_str::<Value>(cleaned) {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!("Skipping malformed ld+json block: {}", e);
                    None
                }
            }
        })
        .collect()
}

/// Depth-bounded walk collecting the price of every `offers` value.
///
/// A node deeper than `depth` levels is never inspected, so hostile or
/// accidentally cyclic-looking markup cannot blow the stack.
pub fn collect_offer_prices(value: &Value, depth: usize, out: &mut Vec<String>) {
    if depth == 0 {
        return;
    }

    match value {
        Value::Object(map) => {
            if let Some(offers) = map.get("offers") {
                offer_prices(offers, out);
            }
            for child in map.values() {
                collect_offer_prices(child, depth - 1, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_offer_prices(item, depth - 1, out);
            }
        }
        _ => {}
    }
}

fn offer_prices(offers: &Value, out: &mut Vec<String>) {
    match offers {
        Value::Object(offer) => {
            let direct = PRICE_KEYS.iter().find_map(|key| offer.get(*key).and_then(scalar_price));
            match direct {
                Some(price) => out.push(price),
                None => {
                    if let Some(spec) = offer.get("priceSpecification") {
                        offer_prices(spec, out);
                    }
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| offer_prices(item, out)),
        _ => {}
    }
}

fn scalar_price(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn open_graph_prices(document: &Html) -> impl Iterator<Item = String> + '_ {
    document
        .select(&OG_PRICE)
        .filter_map(|meta| meta.value().attr("content"))
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(String::from)
}

/// Some CMSes wrap script bodies in HTML comments or CDATA markers.
fn strip_comment_wrappers(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("<!--")
        .and_then(|s| s.strip_suffix("-->"))
        .unwrap_or(trimmed)
        .trim();
    trimmed
        .strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
        .unwrap_or(trimmed)
        .trim()
}
