//! Pure scoring functions: distance → score, lexical overlap, and their fusion.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Tokens ignored by `keyword_overlap`.
const STOPWORDS: &[&str] = &[
    "and", "the", "a", "an", "to", "of", "in", "for", "on", "with", "at", "by", "from",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HybridWeights {
    pub semantic: f64,
    pub keyword: f64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            semantic: 0.7,
            keyword: 0.3,
        }
    }
}

/// Maps a vector distance to 0–100 via `100 / (1 + d)`.
/// Negative distances clamp to 0 and therefore score 100.
pub fn distance_to_score(distance: f64) -> u32 {
    let distance = if distance.is_nan() { 0.0 } else { distance.max(0.0) };
    (100.0 / (1.0 + distance)).round().clamp(0.0, 100.0) as u32
}

/// Jaccard overlap of the two texts' non-stopword tokens, as a percentage.
/// Returns 0 when either side has no tokens.
pub fn keyword_overlap(text_a: &str, text_b: &str) -> u32 {
    let a = tokens(text_a);
    let b = tokens(text_b);
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let intersection = a.intersection(&b).count() as f64;
    let union = a.union(&b).count() as f64;
    ((intersection / union) * 100.0).round() as u32
}

/// Weighted fusion: `semantic * distance_score + keyword * keyword_score`, rounded.
pub fn hybrid_score(distance_score: u32, keyword_score: u32, weights: &HybridWeights) -> u32 {
    let fused =
        weights.semantic * distance_score as f64 + weights.keyword * keyword_score as f64;
    fused.round().max(0.0) as u32
}

/// Lowercase ASCII-alphanumeric runs, minus stopwords.
fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_ascii_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_zero_is_100() {
        assert_eq!(distance_to_score(0.0), 100);
    }

    #[test]
    fn test_negative_distance_clamps_to_100() {
        assert_eq!(distance_to_score(-1.0), 100);
    }

    #[test]
    fn test_distance_one_is_50() {
        assert_eq!(distance_to_score(1.0), 50);
    }

    #[test]
    fn test_distance_score_bounded_and_non_increasing() {
        let mut previous = 100;
        for step in 0..500 {
            let score = distance_to_score(step as f64 * 0.25);
            assert!(score <= 100);
            assert!(score <= previous, "score rose at step {step}");
            previous = score;
        }
        assert_eq!(distance_to_score(1e12), 0);
    }

    #[test]
    fn test_keyword_overlap_identical_text_is_100() {
        assert_eq!(keyword_overlap("Rust tokio axum", "rust TOKIO axum"), 100);
    }

    #[test]
    fn test_keyword_overlap_disjoint_is_0() {
        assert_eq!(keyword_overlap("python django", "rust tokio"), 0);
    }

    #[test]
    fn test_keyword_overlap_empty_side_is_0() {
        assert_eq!(keyword_overlap("", "rust"), 0);
        assert_eq!(keyword_overlap("the and of", "the and of"), 0);
    }

    #[test]
    fn test_keyword_overlap_partial() {
        // {rust, python} vs {rust, go}: 1 / 3 → 33
        assert_eq!(keyword_overlap("Rust and Python", "rust, go"), 33);
    }

    #[test]
    fn test_keyword_overlap_ignores_punctuation() {
        assert_eq!(keyword_overlap("C++/Rust!", "rust c"), 100);
    }

    #[test]
    fn test_hybrid_score_default_weights() {
        assert_eq!(hybrid_score(80, 50, &HybridWeights::default()), 71);
    }

    #[test]
    fn test_hybrid_score_custom_weights() {
        let w = HybridWeights {
            semantic: 0.5,
            keyword: 0.5,
        };
        assert_eq!(hybrid_score(90, 41, &w), 66);
    }
}
