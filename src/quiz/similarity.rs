//! String Similarity
//!
//! Normalized edit-distance ratio used by MCQ answer repair and the
//! lexical grading fallback. The 0.6 / 0.80 acceptance thresholds live
//! with their callers; this module only measures.

use std::collections::HashSet;

/// Levenshtein distance over Unicode scalar values, two-row DP.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// Similarity ratio in `[0.0, 1.0]`.
///
/// `1.0` means identical; two empty strings are identical. Comparison is
/// case-sensitive, so callers fold case first when they want it folded.
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - (levenshtein(a, b) as f64 / longest as f64)
}

/// Distinct lowercased alphanumeric words in `text`
pub fn token_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_classic_pair() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
    }

    #[test]
    fn test_distance_empty_sides() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("", ""), 0);
    }

    #[test]
    fn test_distance_counts_chars_not_bytes() {
        // é is two bytes; one substitution, not two
        assert_eq!(levenshtein("café", "cafe"), 1);
    }

    #[test]
    fn test_similarity_identical_is_one() {
        assert_eq!(similarity("paris", "paris"), 1.0);
    }

    #[test]
    fn test_similarity_both_empty_is_one() {
        assert_eq!(similarity("", ""), 1.0);
    }

    #[test]
    fn test_similarity_disjoint_is_low() {
        assert_eq!(similarity("", "abc"), 0.0);
        assert!(similarity("xyz", "abc") < 0.01);
    }

    #[test]
    fn test_similarity_near_match_clears_repair_threshold() {
        // trailing punctuation barely moves the ratio
        assert!(similarity("paris, france", "paris, france.") > 0.9);
    }

    #[test]
    fn test_token_set_splits_and_folds() {
        let tokens = token_set("The Mitochondria, powerhouse of the CELL!");
        assert!(tokens.contains("mitochondria"));
        assert!(tokens.contains("powerhouse"));
        assert!(tokens.contains("cell"));
        assert!(!tokens.contains(""));
    }

    #[test]
    fn test_token_set_dedupes() {
        let tokens = token_set("cell cell CELL");
        assert_eq!(tokens.len(), 1);
    }
}
