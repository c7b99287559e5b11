use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

// Unicode general categories P* (punctuation) and S* (symbols).
static PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{P}\p{S}]").expect("punctuation pattern is valid"));

/// Collapse every whitespace run to a single space and trim both ends.
pub fn normalize(value: &str) -> String {
    value.split_whitespace().join(" ")
}

/// Remove every punctuation and symbol character.
pub fn strip_punctuation(value: &str) -> String {
    PUNCTUATION.replace_all(value, "").into_owned()
}

/// Whole-sentence comparison key: punctuation stripped, lowercased, whitespace collapsed.
pub fn normalize_for_comparison(value: &str) -> String {
    normalize(&strip_punctuation(value).to_lowercase())
}

/// Per-token comparison key. Tokens carry no whitespace, so no collapsing is needed.
pub fn sanitize_word_for_comparison(value: &str) -> String {
    strip_punctuation(value).to_lowercase()
}

/// Split on whitespace runs; never yields empty tokens.
pub fn tokenize(value: &str) -> Vec<&str> {
    value.split_whitespace().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  hello \t\n  world  "), "hello world");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for sample in ["a  b", " x\ty\nz ", "", "already clean"] {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_strip_punctuation_and_symbols() {
        assert_eq!(strip_punctuation("Hello, world!"), "Hello world");
        assert_eq!(strip_punctuation("it's $5 + 3€"), "its 5  3");
        assert_eq!(strip_punctuation("«quoted» — dash"), "quoted  dash");
        assert_eq!(strip_punctuation("...!?"), "");
    }

    #[test]
    fn test_strip_punctuation_keeps_letters_and_digits() {
        assert_eq!(strip_punctuation("café 42"), "café 42");
    }

    #[test]
    fn test_normalize_for_comparison() {
        assert_eq!(normalize_for_comparison("Hello,   World!"), "hello world");
        assert_eq!(
            normalize_for_comparison("Hello, world!"),
            normalize_for_comparison("hello world")
        );
        // a punctuation-only token leaves no gap behind
        assert_eq!(normalize_for_comparison("wait - what"), "wait what");
    }

    #[test]
    fn test_sanitize_word() {
        assert_eq!(sanitize_word_for_comparison("Window."), "window");
        assert_eq!(sanitize_word_for_comparison("--"), "");
        assert_eq!(sanitize_word_for_comparison("DON'T"), "dont");
    }

    #[test]
    fn test_tokenize_skips_empty_runs() {
        assert_eq!(tokenize("  The  quick\tbrown  "), vec!["The", "quick", "brown"]);
        assert!(tokenize("   ").is_empty());
    }
}
