//! Dictionary cross-check that removes false-positive spelling flags.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use log::debug;

use super::text::levenshtein;
use super::SpellingIssue;
use crate::error::ConfigError;
use crate::language::Language;

const MAX_SUGGESTION_DISTANCE: usize = 2;

/// Spelling knowledge for the cross-check. Implementations must be pure.
pub trait Dictionary: Send + Sync {
    /// `word` is lower-case letters only.
    fn is_correct(&self, word: &str) -> bool;

    fn suggest(&self, word: &str) -> Option<String>;
}

/// Lower-cased letters of `word`, everything else removed.
pub fn letters_only(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect()
}

/// A plain word list, one word per line.
pub struct WordListDictionary {
    words: BTreeSet<String>,
}

impl WordListDictionary {
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| letters_only(w.as_ref()))
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Dictionary {
            path: path.to_path_buf(),
            source: e,
        })?;
        let dictionary = Self::from_words(content.lines());
        debug!("Loaded {} dictionary words", dictionary.len());
        Ok(dictionary)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Dictionary for WordListDictionary {
    fn is_correct(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    /// Closest word within edit distance 2; ties go to the alphabetically first.
    fn suggest(&self, word: &str) -> Option<String> {
        let len = word.chars().count();
        let mut best: Option<(usize, &String)> = None;

        // BTreeSet iterates alphabetically, so only a strictly closer word replaces the best
        for candidate in &self.words {
            if candidate.chars().count().abs_diff(len) > MAX_SUGGESTION_DISTANCE {
                continue;
            }
            let distance = levenshtein(word, candidate);
            if distance == 0 || distance > MAX_SUGGESTION_DISTANCE {
                continue;
            }
            if best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, candidate));
            }
        }

        best.map(|(_, w)| w.clone())
    }
}

/// Filters flagged words against a dictionary in English mode.
#[derive(Clone)]
pub struct SpellCrossValidator {
    dictionary: Arc<dyn Dictionary>,
}

impl SpellCrossValidator {
    pub fn new(dictionary: Arc<dyn Dictionary>) -> Self {
        Self { dictionary }
    }

    /// Drops flags the dictionary disagrees with. Romanized Hindi has no
    /// dictionary, so its flags pass through unchanged.
    pub fn filter(&self, language: Language, issues: Vec<SpellingIssue>) -> Vec<SpellingIssue> {
        if !language.is_english() {
            return issues;
        }

        issues
            .into_iter()
            .filter_map(|issue| {
                let word = letters_only(&issue.word);
                if word.is_empty() || self.dictionary.is_correct(&word) {
                    return None;
                }
                let suggestion = issue
                    .suggestion
                    .filter(|s| !s.trim().is_empty())
                    .or_else(|| self.dictionary.suggest(&word));
                Some(SpellingIssue {
                    word: issue.word.trim().to_string(),
                    suggestion,
                    context: issue.context,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn issue(word: &str, suggestion: Option<&str>) -> SpellingIssue {
        SpellingIssue {
            word: word.to_string(),
            suggestion: suggestion.map(str::to_string),
            context: None,
        }
    }

    fn dictionary() -> Arc<WordListDictionary> {
        Arc::new(WordListDictionary::from_words([
            "hello", "world", "welcome", "back", "bat", "cat", "receive",
        ]))
    }

    #[test]
    fn test_letters_only() {
        assert_eq!(letters_only("Hello!"), "hello");
        assert_eq!(letters_only("don't"), "dont");
        assert_eq!(letters_only("123"), "");
    }

    #[test]
    fn test_known_words_are_dropped() {
        let validator = SpellCrossValidator::new(dictionary());
        let kept = validator.filter(
            Language::En,
            vec![issue("Hello,", None), issue("Welcom", Some("Welcome"))],
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].word, "Welcom");
        assert_eq!(kept[0].suggestion.as_deref(), Some("Welcome"));
    }

    #[test]
    fn test_noise_words_are_dropped() {
        let validator = SpellCrossValidator::new(dictionary());
        let kept = validator.filter(Language::En, vec![issue("2024", None), issue("--", None)]);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_missing_suggestion_is_filled() {
        let validator = SpellCrossValidator::new(dictionary());
        let kept = validator.filter(Language::En, vec![issue("recieve", Some(" "))]);
        assert_eq!(kept[0].suggestion.as_deref(), Some("receive"));
    }

    #[test]
    fn test_hinglish_passes_through() {
        let validator = SpellCrossValidator::new(dictionary());
        let flagged = vec![issue("hello", None), issue("kya", None)];
        assert_eq!(validator.filter(Language::HiLatin, flagged.clone()), flagged);
    }

    #[test]
    fn test_filter_is_deterministic() {
        let validator = SpellCrossValidator::new(dictionary());
        let flagged = vec![issue("wrold", None), issue("hello", None)];
        assert_eq!(
            validator.filter(Language::En, flagged.clone()),
            validator.filter(Language::En, flagged)
        );
    }

    #[test]
    fn test_suggestion_tie_breaks_alphabetically() {
        let dict = dictionary();
        // "bat" and "cat" are both one edit from "hat"
        assert_eq!(dict.suggest("hat").as_deref(), Some("bat"));
        assert_eq!(dict.suggest("wrold").as_deref(), Some("world"));
        assert_eq!(dict.suggest("zzzzzzzz"), None);
    }

    #[test]
    fn test_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Apple\nbanana\n\n  cherry  ").unwrap();

        let dict = WordListDictionary::from_path(file.path()).unwrap();
        assert_eq!(dict.len(), 3);
        assert!(dict.is_correct("apple"));
        assert!(dict.is_correct("cherry"));
    }

    #[test]
    fn test_from_missing_path() {
        let result = WordListDictionary::from_path(Path::new("/nonexistent/words"));
        assert!(matches!(result, Err(ConfigError::Dictionary { .. })));
    }
}
