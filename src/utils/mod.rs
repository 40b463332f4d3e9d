//! Utility functions and helpers.

pub mod http;
pub mod url;

use unicode_segmentation::UnicodeSegmentation;

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max` grapheme clusters, marking the cut with `…`.
pub fn truncate_graphemes(s: &str, max: usize) -> String {
    let graphemes: Vec<&str> = s.graphemes(true).collect();
    if graphemes.len() <= max {
        return s.to_string();
    }
    if max == 0 {
        return String::new();
    }

    let mut out: String = graphemes[..max - 1].concat();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(
            normalize_whitespace("  New\n\t Releases   Today "),
            "New Releases Today"
        );
        assert_eq!(normalize_whitespace("   "), "");
    }

    #[test]
    fn test_truncate_graphemes_short_input_untouched() {
        assert_eq!(truncate_graphemes("short", 10), "short");
    }

    #[test]
    fn test_truncate_graphemes_counts_clusters() {
        let title = "Le\u{0301}gion of the Damned";
        let out = truncate_graphemes(title, 5);
        assert_eq!(out.graphemes(true).count(), 5);
        assert!(out.starts_with("Le\u{0301}"));
        assert!(out.ends_with('…'));
    }
}
