//! Vietnamese đồng price normalization
//!
//! Every adapter and every extraction stage funnels raw price text through
//! [`vn_number`], so `1.234.567 ₫` is the only price shape callers ever see.

use once_cell::sync::Lazy;
use regex::Regex;

pub const CURRENCY_SYMBOL: &str = "₫";

/// Fewer digits than this is a quantity, a rating or a model number, not a price.
pub const MIN_PRICE_DIGITS: usize = 5;

/// Thousands-grouped number (>= 2 groups) or a bare digit run, leftmost first
static AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{1,3}(?:[.,\s]\d{3})+|\d+").expect("amount pattern is valid")
});

/// Amount followed by a đồng marker, for free-text scanning.
/// Word markers must not run into a letter ("12.345 đánh giá" is not a price).
static CURRENCY_AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,3}(?:[.,\s]\d{3})+|\d{5,})\s*(?:₫|(?:vnđ|vnd|đ)(?:[^\p{L}]|$))")
        .expect("currency pattern is valid")
});

/// Normalize free-text price into the canonical `1.234.567 ₫` form.
///
/// Takes the first grouped or bare number in `text`, drops its separators and
/// rejects anything shorter than [`MIN_PRICE_DIGITS`] digits.
pub fn vn_number(text: &str) -> Option<String> {
    let found = AMOUNT.find(text)?;
    let digits: String = found.as_str().chars().filter(char::is_ascii_digit).collect();

    if digits.len() < MIN_PRICE_DIGITS {
        return None;
    }

    Some(format!("{} {CURRENCY_SYMBOL}", group_thousands(&digits)))
}

/// First currency-marked amount in free text, normalized
pub fn find_currency_amount(text: &str) -> Option<String> {
    CURRENCY_AMOUNT
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .find_map(|m| vn_number(m.as_str()))
}

/// Numeric value of a canonical price string
pub fn price_value(price: &str) -> Option<u64> {
    let digits: String = price.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}
