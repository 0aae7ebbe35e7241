//! 공통 유틸리티 함수들
//!
//! Text helpers shared by the query normalizer and the HTML extractors.

/// Collapse every whitespace run (including non-breaking spaces) to a single
/// space and trim both ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lookup key for a site display name: trimmed and Unicode-lowercased
/// ("NGUYỄN KIM" and "Nguyễn Kim" are the same site).
pub fn site_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Truncate to at most `max_chars` characters, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_mixed_whitespace() {
        assert_eq!(collapse_whitespace("  Tivi \t LG\n\n65UQ7550 "), "Tivi LG 65UQ7550");
        assert_eq!(collapse_whitespace("12.990.000\u{a0}₫"), "12.990.000 ₫");
        assert_eq!(collapse_whitespace("   "), "");
    }

    #[test]
    fn site_key_folds_vietnamese_capitals() {
        assert_eq!(site_key(" NGUYỄN KIM "), site_key("Nguyễn Kim"));
        assert_ne!(site_key("Điện Máy Xanh"), site_key("Dien May Xanh"));
    }

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate_chars("Quà tặng", 3), "Quà");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
