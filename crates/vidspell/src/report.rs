//! Final per-job report assembled once the compare phase finishes.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::{AnalysisResult, ComparisonEntry, Verdict};
use crate::engine::AudioSegment;
use crate::language::Language;

/// A flagged word, listed once per report at its first appearance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueEntry {
    pub word: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub frame_index: u32,
    pub timestamp: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_frames: u32,
    pub analysed_frames: u32,
    /// Frames dropped as echoes or malformed responses.
    pub dropped_frames: u32,
    pub frames_with_text: u32,
    pub issue_count: u32,
    pub matches: u32,
    pub partials: u32,
    pub mismatches: u32,
    pub no_caption: u32,
    pub review: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub language: Language,
    pub results: Vec<AnalysisResult>,
    pub comparisons: Vec<ComparisonEntry>,
    /// On-screen text of every frame, newline separated, in frame order.
    pub transcript: String,
    pub audio_transcript: Vec<AudioSegment>,
    pub issues: Vec<IssueEntry>,
    pub summary: ReportSummary,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    pub fn build(
        language: Language,
        total_frames: u32,
        mut results: Vec<AnalysisResult>,
        audio_transcript: Vec<AudioSegment>,
        comparisons: Vec<ComparisonEntry>,
    ) -> Self {
        results.sort_by_key(|r| r.frame_index);

        let transcript = results
            .iter()
            .filter_map(AnalysisResult::caption)
            .collect::<Vec<_>>()
            .join("\n");

        let issues = dedup_issues(&results);

        let mut summary = ReportSummary {
            total_frames,
            analysed_frames: results.len() as u32,
            dropped_frames: total_frames.saturating_sub(results.len() as u32),
            frames_with_text: results.iter().filter(|r| r.caption().is_some()).count() as u32,
            issue_count: issues.len() as u32,
            ..ReportSummary::default()
        };
        for entry in &comparisons {
            match entry.verdict {
                Verdict::Match => summary.matches += 1,
                Verdict::Partial => summary.partials += 1,
                Verdict::Mismatch => summary.mismatches += 1,
                Verdict::NoCaption => summary.no_caption += 1,
                Verdict::Review => summary.review += 1,
            }
        }

        Self {
            language,
            results,
            comparisons,
            transcript,
            audio_transcript,
            issues,
            summary,
            generated_at: Utc::now(),
        }
    }
}

fn dedup_issues(results: &[AnalysisResult]) -> Vec<IssueEntry> {
    let mut seen = HashSet::new();
    let mut issues = Vec::new();
    for result in results {
        for issue in &result.issues {
            if seen.insert(issue.word.trim().to_lowercase()) {
                issues.push(IssueEntry {
                    word: issue.word.clone(),
                    suggestion: issue.suggestion.clone(),
                    context: issue.context.clone(),
                    frame_index: result.frame_index,
                    timestamp: result.timestamp,
                });
            }
        }
    }
    issues
}
