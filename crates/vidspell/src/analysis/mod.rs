//! Per-frame response validation, spelling cross-checks and caption/audio alignment.

pub mod aligner;
pub mod prompt;
pub mod retry;
pub mod spell;
pub mod text;
pub mod validator;

use serde::{Deserialize, Serialize};

pub use aligner::{CaptionAligner, ComparisonEntry, Verdict};
pub use retry::{attempt, Exhausted, Step};
pub use spell::{Dictionary, SpellCrossValidator, WordListDictionary};
pub use validator::{FrameOutcome, ResponseValidator};

/// A word the vision model flagged as misspelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellingIssue {
    pub word: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Validated findings for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub frame_index: u32,
    pub timestamp: f64,
    /// On-screen text, `None` when the frame shows none.
    pub text: Option<String>,
    pub issues: Vec<SpellingIssue>,
}

impl AnalysisResult {
    /// Trimmed on-screen text, skipping empty strings.
    pub fn caption(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}
