pub const DEFAULT_MAX_CHARS: usize = 1200;
pub const DEFAULT_OVERLAP: usize = 150;

/// Splits resume text into overlapping character windows.
///
/// Lines are trimmed and blank lines dropped before windowing. Consecutive
/// chunks share `overlap` characters; each chunk is at most `max_chars` long.
pub fn chunk_text(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    if max_chars == 0 {
        return Vec::new();
    }

    let cleaned = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    let chars: Vec<char> = cleaned.chars().collect();

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + max_chars).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        if end == chars.len() {
            break;
        }
        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunking_overlap_and_size() {
        let text = "a".repeat(3000);
        let chunks = chunk_text(&text, 1200, 150);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 1200));
        assert_eq!(&chunks[0][1050..], &text[1050..1200]);
        assert_eq!(&chunks[1][..150], &chunks[0][1050..]);
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = chunk_text("  Rust engineer  \n\n\n  Tokio  \n", DEFAULT_MAX_CHARS, DEFAULT_OVERLAP);
        assert_eq!(chunks, vec!["Rust engineer\nTokio".to_string()]);
    }

    #[test]
    fn test_blank_text_has_no_chunks() {
        assert!(chunk_text(" \n \n", 1200, 150).is_empty());
    }

    #[test]
    fn test_overlap_not_smaller_than_window_still_advances() {
        let chunks = chunk_text("abcdefghij", 4, 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_multibyte_text_is_split_on_char_boundaries() {
        let chunks = chunk_text("éééééé", 4, 1);
        assert_eq!(chunks, vec!["éééé", "ééé"]);
    }
}
