//! Plain-text helpers shared by ingestion and matching.

use scraper::Html;

/// Converts HTML into readable plain text for display and scoring.
///
/// Text nodes are trimmed, empty ones dropped, and the rest joined with a
/// single space. Plain text passes through with its whitespace collapsed.
pub fn strip_html(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let fragment = Html::parse_fragment(text);
    let joined = fragment
        .root_element()
        .text()
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns at most `max_chars` characters of `text`, never splitting a code point.
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
    fn test_strip_html_removes_tags() {
        let html = "<div><p>Senior <b>Rust</b> Engineer</p>\n\n<ul><li>Tokio</li></ul></div>";
        assert_eq!(strip_html(html), "Senior Rust Engineer Tokio");
    }

    #[test]
    fn test_strip_html_plain_text_collapses_whitespace() {
        assert_eq!(strip_html("  remote   role \n\n  "), "remote role");
    }

    #[test]
    fn test_strip_html_empty() {
        assert_eq!(strip_html(""), "");
        assert_eq!(strip_html("   "), "");
    }

    #[test]
    fn test_truncate_chars_respects_code_points() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }
}
