//! Best-effort JSON recovery from model output.

use serde_json::Value;

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Finds a JSON value embedded in prose.
///
/// Tries, in order: each balanced `[...]` span that parses to an array of
/// objects, the widest `[...]` span (first `[` to last `]`), each balanced
/// `{...}` span, then the widest `{...}` span. Returns `None` when nothing
/// bracketed parses.
pub fn extract_embedded_json(text: &str) -> Option<Value> {
    let is_object_array = |v: &Value| {
        v.as_array()
            .map(|items| items.iter().all(Value::is_object))
            .unwrap_or(false)
    };

    first_balanced(text, '[', ']', is_object_array)
        .or_else(|| widest(text, '[', ']'))
        .or_else(|| first_balanced(text, '{', '}', Value::is_object))
        .or_else(|| widest(text, '{', '}'))
}

fn first_balanced(
    text: &str,
    open: char,
    close: char,
    accept: impl Fn(&Value) -> bool,
) -> Option<Value> {
    text.match_indices(open)
        .filter_map(|(start, _)| balanced_span(&text[start..], open, close))
        .filter_map(|span| serde_json::from_str::<Value>(span).ok())
        .find(|value| accept(value))
}

fn widest(text: &str, open: char, close: char) -> Option<Value> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Given text starting at `open`, returns the prefix up to its matching
/// `close`, skipping brackets inside JSON string literals.
fn balanced_span(text: &str, open: char, close: char) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..idx + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
