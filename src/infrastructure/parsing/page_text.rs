//! Visible page text and free-text fallbacks

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::utils::collapse_whitespace;

/// Elements whose text never renders
const HIDDEN_ELEMENTS: [&str; 5] = ["script", "style", "noscript", "template", "head"];

static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("body selector is valid"));

/// Rendered text of the document body, whitespace collapsed to single spaces.
pub fn visible_text(document: &Html) -> String {
    let mut raw = String::new();
    match document.select(&BODY).next() {
        Some(body) => push_visible(body, &mut raw),
        None => push_visible(document.root_element(), &mut raw),
    }
    collapse_whitespace(&raw)
}

fn push_visible(element: ElementRef<'_>, out: &mut String) {
    if HIDDEN_ELEMENTS.contains(&element.value().name()) {
        return;
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    push_visible(child_element, out);
                }
            }
            _ => {}
        }
    }
}

/// Text of an element with whitespace collapsed
pub fn element_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Promotion keyword matcher built from a keyword vocabulary.
#[derive(Debug, Clone)]
pub struct PromoMatcher {
    /// `None` for an empty vocabulary
    pattern: Option<Regex>,
}

impl PromoMatcher {
    /// Keywords are matched literally and case-insensitively, each followed
    /// by up to `context_chars` characters.
    pub fn new(keywords: &[String], context_chars: usize) -> Result<Self, regex::Error> {
        let alternation = keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("|");

        if alternation.is_empty() {
            return Ok(Self { pattern: None });
        }

        let pattern = Regex::new(&format!(r"(?i)(?:{alternation}).{{0,{context_chars}}}"))?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    /// First keyword occurrence with its trailing context
    pub fn find(&self, text: &str) -> Option<String> {
        self.pattern
            .as_ref()?
            .find(text)
            .map(|m| m.as_str().trim().to_string())
            .filter(|promo| !promo.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::parsing::ParsingConfig;

    fn matcher() -> PromoMatcher {
        let config = ParsingConfig::default();
        PromoMatcher::new(&config.promo_keywords, config.promo_context_chars).unwrap()
    }

    #[test]
    fn visible_text_skips_scripts_and_styles() {
        let document = Html::parse_document(
            r#"<html><head><title>T</title><style>.a{}</style></head>
            <body><p>Giá   <b>9.990.000₫</b></p><script>var p = 1;</script>
            <noscript>bật JS</noscript><template><i>ẩn</i></template></body></html>"#,
        );
        assert_eq!(visible_text(&document), "Giá 9.990.000₫");
    }

    #[test]
    fn promo_keeps_keyword_and_trailing_context() {
        let text = "Tivi LG Quà tặng: Loa soundbar trị giá 2 triệu. Bảo hành 2 năm";
        let promo = matcher().find(text).unwrap();
        assert!(promo.starts_with("Quà tặng: Loa soundbar"));
    }

    #[test]
    fn promo_context_is_bounded() {
        let text = format!("Khuyến mãi {}", "x".repeat(500));
        let promo = matcher().find(&text).unwrap();
        assert_eq!(promo.chars().count(), "Khuyến mãi".chars().count() + 100);
    }

    #[test]
    fn promo_matching_is_case_insensitive() {
        assert!(matcher().find("HOT DISCOUNT today").is_some());
        assert!(matcher().find("Không có gì").is_none());
    }

    #[test]
    fn empty_vocabulary_never_matches() {
        let matcher = PromoMatcher::new(&[], 100).unwrap();
        assert!(matcher.find("quà tặng").is_none());
    }
}
