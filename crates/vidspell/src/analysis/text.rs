//! Text normalization and similarity measures shared by the validator and aligner.

use std::collections::BTreeSet;

/// Lower-cases, strips punctuation and collapses whitespace.
///
/// Apostrophes inside words are dropped rather than split, so "don't" and
/// "dont" normalize to the same token.
pub fn normalize(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_alphanumeric() {
            cleaned.extend(c.to_lowercase());
        } else if c == '\'' || c == '\u{2019}' {
            continue;
        } else {
            cleaned.push(' ');
        }
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Distinct tokens of an already-normalized string.
pub fn token_set(normalized: &str) -> BTreeSet<&str> {
    normalized.split_whitespace().collect()
}

/// Shared distinct tokens divided by the larger token set.
pub fn token_overlap(a: &str, b: &str) -> f64 {
    let left = token_set(a);
    let right = token_set(b);
    let denominator = left.len().max(right.len());
    if denominator == 0 {
        return 0.0;
    }
    let shared = left.intersection(&right).count();
    shared as f64 / denominator as f64
}

/// Character-level Levenshtein distance.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev = (0..=n).collect::<Vec<usize>>();
    let mut curr = vec![0usize; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = if a_chars[i - 1] == b_chars[j - 1] {
                0
            } else {
                1
            };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// `1 - distance / max_len`, in [0, 1]. Two empty strings are identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

/// Length ratio of the shorter string to the longer one when one contains the
/// other, otherwise `None`.
pub fn containment_ratio(a: &str, b: &str) -> Option<f64> {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() || !long.contains(short) {
        return None;
    }
    Some(short.chars().count() as f64 / long.chars().count() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("Hello, World!"), "hello world");
        assert_eq!(normalize("  multiple\n\tspaces  "), "multiple spaces");
        assert_eq!(normalize("Don't stop"), "dont stop");
        assert_eq!(normalize("a | b"), "a b");
        assert_eq!(normalize("!!!"), "");
    }

    #[test]
    fn test_token_overlap() {
        assert!((token_overlap("the quick fox", "a slow fox") - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(token_overlap("a b", "a b"), 1.0);
        assert_eq!(token_overlap("", ""), 0.0);
        assert_eq!(token_overlap("a a a", "a"), 1.0);
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("flaw", "lawn"), 2);
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("same", "same"), 1.0);
        assert_eq!(similarity("abcd", "wxyz"), 0.0);
        assert!((similarity("abcd", "abce") - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_containment_ratio() {
        assert_eq!(containment_ratio("hello", "hello world there"), Some(5.0 / 17.0));
        assert_eq!(containment_ratio("hello world", "hello"), Some(5.0 / 11.0));
        assert_eq!(containment_ratio("abc", "xyz"), None);
        assert_eq!(containment_ratio("", "xyz"), None);
    }
}
