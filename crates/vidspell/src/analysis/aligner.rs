//! Matches transcribed speech against the on-screen text shown at the same time.

use serde::Serialize;

use super::text::{containment_ratio, normalize, similarity, token_overlap};
use super::AnalysisResult;
use crate::config::AnalysisConfig;
use crate::engine::AudioSegment;
use crate::language::Language;

const CAPTION_SEPARATOR: &str = " | ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Match,
    Partial,
    Mismatch,
    /// Speech with nothing on screen.
    NoCaption,
    /// Scripts differ; a person has to compare them.
    Review,
}

/// Agreement between one speech segment and its concurrent captions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonEntry {
    pub start: f64,
    pub end: f64,
    pub audio_text: Option<String>,
    pub caption_text: Option<String>,
    pub verdict: Verdict,
    /// Normalized edit similarity as a percentage; absent for `Review` and `NoCaption`.
    pub score: Option<u8>,
}

#[derive(Debug, Clone)]
pub struct CaptionAligner {
    match_ratio: f64,
    partial_overlap: f64,
}

impl CaptionAligner {
    pub fn new(match_ratio: f64, partial_overlap: f64) -> Self {
        Self {
            match_ratio,
            partial_overlap,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            config.thresholds.match_ratio,
            config.thresholds.partial_overlap,
        )
    }

    /// One entry per segment, ordered by `(start, end)`.
    pub fn align(
        &self,
        segments: &[AudioSegment],
        results: &[AnalysisResult],
        language: Language,
    ) -> Vec<ComparisonEntry> {
        let mut frames: Vec<&AnalysisResult> = results.iter().collect();
        frames.sort_by(|a, b| {
            a.timestamp
                .total_cmp(&b.timestamp)
                .then(a.frame_index.cmp(&b.frame_index))
        });

        let mut ordered: Vec<&AudioSegment> = segments
            .iter()
            .filter(|s| !s.text.trim().is_empty())
            .collect();
        ordered.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.end.total_cmp(&b.end)));

        ordered
            .into_iter()
            .map(|segment| {
                let caption = concurrent_caption(&frames, segment.start, segment.end);
                self.compare(segment, caption, language)
            })
            .collect()
    }

    fn compare(
        &self,
        segment: &AudioSegment,
        caption: Option<String>,
        language: Language,
    ) -> ComparisonEntry {
        let audio_text = segment.text.trim().to_string();

        let (verdict, score) = match (&caption, language) {
            (_, Language::HiLatin) => (Verdict::Review, None),
            (None, Language::En) => (Verdict::NoCaption, None),
            (Some(caption), Language::En) => {
                let spoken = normalize(&audio_text);
                let shown = normalize(caption);
                let score = (similarity(&spoken, &shown) * 100.0).round() as u8;
                (self.classify(&spoken, &shown), Some(score))
            }
        };

        ComparisonEntry {
            start: segment.start,
            end: segment.end,
            audio_text: Some(audio_text),
            caption_text: caption,
            verdict,
            score,
        }
    }

    /// Verdict for two normalized English texts.
    pub fn classify(&self, spoken: &str, shown: &str) -> Verdict {
        if spoken.is_empty() || shown.is_empty() {
            return if spoken == shown {
                Verdict::Match
            } else {
                Verdict::Mismatch
            };
        }
        if spoken == shown {
            return Verdict::Match;
        }
        if containment_ratio(spoken, shown).is_some_and(|ratio| ratio >= self.match_ratio) {
            return Verdict::Match;
        }
        if token_overlap(spoken, shown) >= self.partial_overlap {
            return Verdict::Partial;
        }
        Verdict::Mismatch
    }
}

/// Distinct on-screen texts of the frames concurrent with `[start, end]`.
///
/// Falls back to the latest frame before `start` when no frame lies inside
/// the window. `frames` must be in timeline order.
fn concurrent_caption(frames: &[&AnalysisResult], start: f64, end: f64) -> Option<String> {
    let inside: Vec<&AnalysisResult> = frames
        .iter()
        .copied()
        .filter(|f| f.timestamp >= start && f.timestamp <= end)
        .collect();

    let window: Vec<&AnalysisResult> = if inside.is_empty() {
        frames
            .iter()
            .copied()
            .filter(|f| f.timestamp < start)
            .last()
            .into_iter()
            .collect()
    } else {
        inside
    };

    let mut texts: Vec<&str> = Vec::new();
    for caption in window.iter().filter_map(|f| f.caption()) {
        if !texts.contains(&caption) {
            texts.push(caption);
        }
    }

    if texts.is_empty() {
        None
    } else {
        Some(texts.join(CAPTION_SEPARATOR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aligner() -> CaptionAligner {
        CaptionAligner::from_config(&AnalysisConfig::default())
    }

    fn segment(start: f64, end: f64, text: &str) -> AudioSegment {
        AudioSegment {
            start,
            end,
            text: text.to_string(),
            language: "en".to_string(),
        }
    }

    fn frame(index: u32, timestamp: f64, text: Option<&str>) -> AnalysisResult {
        AnalysisResult {
            frame_index: index,
            timestamp,
            text: text.map(str::to_string),
            issues: Vec::new(),
        }
    }

    #[test]
    fn test_punctuation_and_case_match() {
        let entries = aligner().align(
            &[segment(0.0, 2.0, "hello world")],
            &[frame(0, 0.0, Some("Hello, World!"))],
            Language::En,
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].verdict, Verdict::Match);
        assert_eq!(entries[0].score, Some(100));
        assert_eq!(entries[0].caption_text.as_deref(), Some("Hello, World!"));
    }

    #[test]
    fn test_low_overlap_is_mismatch() {
        let a = aligner();
        assert_eq!(a.classify("the quick fox", "a slow fox"), Verdict::Mismatch);
    }

    #[test]
    fn test_partial_threshold_boundary() {
        let a = aligner();
        // 2 shared of 4 distinct tokens: exactly 0.5
        assert_eq!(a.classify("one two three four", "one two five six"), Verdict::Partial);
        // 1 shared of 3: below 0.5
        assert_eq!(a.classify("one two three", "one five six"), Verdict::Mismatch);
    }

    #[test]
    fn test_containment_match_threshold_boundary() {
        let a = CaptionAligner::new(0.5, 0.99);
        // "abcd" inside "abcd efg" (4 of 8 chars): exactly 0.5
        assert_eq!(a.classify("abcd", "abcd efg"), Verdict::Match);
        assert_eq!(a.classify("abc", "abc defgh"), Verdict::Mismatch);
    }

    #[test]
    fn test_default_containment_match() {
        let a = aligner();
        assert_eq!(
            a.classify("welcome to the channel", "welcome to the channel everyone"),
            Verdict::Match
        );
    }

    #[test]
    fn test_no_concurrent_text_is_no_caption() {
        let entries = aligner().align(
            &[segment(4.0, 6.0, "anyone there")],
            &[frame(2, 4.0, None)],
            Language::En,
        );
        assert_eq!(entries[0].verdict, Verdict::NoCaption);
        assert_eq!(entries[0].score, None);
        assert_eq!(entries[0].caption_text, None);

        let entries = aligner().align(&[segment(0.0, 1.0, "hi")], &[], Language::En);
        assert_eq!(entries[0].verdict, Verdict::NoCaption);
    }

    #[test]
    fn test_hinglish_is_always_review() {
        let entries = aligner().align(
            &[segment(0.0, 2.0, "kya haal hai"), segment(3.0, 4.0, "theek hai")],
            &[frame(0, 0.0, Some("kya haal hai"))],
            Language::HiLatin,
        );
        assert!(entries.iter().all(|e| e.verdict == Verdict::Review));
        assert!(entries.iter().all(|e| e.score.is_none()));
        assert_eq!(entries[0].caption_text.as_deref(), Some("kya haal hai"));
    }

    #[test]
    fn test_window_dedups_and_joins_in_frame_order() {
        let frames = [
            frame(1, 2.0, Some("Sale")),
            frame(0, 0.0, Some("Intro")),
            frame(2, 4.0, Some("Sale")),
            frame(3, 6.0, Some("Outro")),
        ];
        let entries = aligner().align(&[segment(0.0, 4.0, "intro sale")], &frames, Language::En);
        assert_eq!(entries[0].caption_text.as_deref(), Some("Intro | Sale"));
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let frames = [frame(0, 2.0, Some("Edge")), frame(1, 4.0, Some("Other"))];
        let entries = aligner().align(&[segment(2.0, 2.0, "edge")], &frames, Language::En);
        assert_eq!(entries[0].caption_text.as_deref(), Some("Edge"));
    }

    #[test]
    fn test_falls_back_to_nearest_preceding_frame() {
        let frames = [
            frame(0, 0.0, Some("First")),
            frame(1, 2.0, Some("Second")),
            frame(2, 8.0, Some("Later")),
        ];
        let entries = aligner().align(&[segment(2.5, 3.5, "second")], &frames, Language::En);
        assert_eq!(entries[0].caption_text.as_deref(), Some("Second"));
        assert_eq!(entries[0].verdict, Verdict::Match);
    }

    #[test]
    fn test_output_sorted_and_stable() {
        let segments = [
            segment(5.0, 6.0, "c"),
            segment(0.0, 2.0, "a"),
            segment(0.0, 1.0, "b"),
            segment(0.0, 1.0, "b2"),
            segment(3.0, 4.0, "   "),
        ];
        let entries = aligner().align(&segments, &[], Language::En);
        let texts: Vec<_> = entries
            .iter()
            .map(|e| e.audio_text.clone().unwrap())
            .collect();
        assert_eq!(texts, vec!["b", "b2", "a", "c"]);
    }

    #[test]
    fn test_identical_inputs_serialize_identically() {
        let segments = [segment(0.0, 2.0, "hello"), segment(2.0, 4.0, "world")];
        let frames = [frame(0, 0.0, Some("hello")), frame(1, 2.0, Some("word"))];
        let first = serde_json::to_string(&aligner().align(&segments, &frames, Language::En)).unwrap();
        let second =
            serde_json::to_string(&aligner().align(&segments, &frames, Language::En)).unwrap();
        assert_eq!(first, second);
    }
}
