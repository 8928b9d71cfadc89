//! Rejects vision-model responses that echo the instruction or do not follow
//! the `{text, errors[]}` shape, retrying malformed ones a bounded number of times.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::LazyLock;
use std::time::Duration;

use log::{debug, warn};
use regex::Regex;
use serde::Deserialize;

use super::prompt;
use super::retry::{attempt, Exhausted, Step};
use super::text::{normalize, similarity};
use super::{AnalysisResult, SpellingIssue};
use crate::config::AnalysisConfig;
use crate::engine::{Frame, VisionModel};
use crate::error::InferenceError;
use crate::language::Language;
use crate::sanitize;

static RE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```").unwrap());

#[derive(Debug, Deserialize)]
struct ModelPayload {
    #[serde(default)]
    text: Option<String>,
    errors: Vec<SpellingIssue>,
}

/// A response that parsed into the expected shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub text: Option<String>,
    pub issues: Vec<SpellingIssue>,
}

/// What happened to one frame.
#[derive(Debug)]
pub enum FrameOutcome {
    Accepted(AnalysisResult),
    /// The model repeated its instruction; dropped without retry.
    Echo,
    /// No usable response after all attempts, with at least one reply received.
    Malformed { attempts: u32 },
    /// Every attempt failed to reach the service.
    Unreachable(InferenceError),
}

enum Rejection {
    Malformed,
    Transport(InferenceError),
}

pub struct ResponseValidator {
    echo_similarity: f64,
    echo_markers: Vec<String>,
    echo_marker_min_hits: usize,
    max_retries: u32,
}

impl ResponseValidator {
    pub fn new(
        echo_similarity: f64,
        echo_markers: Vec<String>,
        echo_marker_min_hits: usize,
        max_retries: u32,
    ) -> Self {
        Self {
            echo_similarity,
            echo_markers: echo_markers
                .iter()
                .map(|m| normalize(m))
                .filter(|m| !m.is_empty())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            echo_marker_min_hits,
            max_retries,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            config.thresholds.echo_similarity,
            config.validation.echo_markers.clone(),
            config.validation.echo_marker_min_hits,
            config.validation.max_retries,
        )
    }

    /// True when `text` repeats the instruction rather than describing the frame.
    ///
    /// A verbatim copy of the instruction is an echo only if nothing but
    /// marker phrases remains once it is removed.
    pub fn is_echo(&self, text: &str, instruction: &str) -> bool {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return false;
        }

        let instruction = normalize(instruction);
        if !instruction.is_empty() && normalized.contains(&instruction) {
            let remainder = normalized.replace(&instruction, " ");
            return self.strip_markers(&remainder).is_empty();
        }
        if similarity(&normalized, &instruction) >= self.echo_similarity {
            return true;
        }

        let hits = self
            .echo_markers
            .iter()
            .filter(|marker| normalized.contains(marker.as_str()))
            .count();
        self.echo_marker_min_hits > 0 && hits >= self.echo_marker_min_hits
    }

    /// Normalized `text` with every marker phrase removed.
    fn strip_markers(&self, text: &str) -> String {
        let mut rest = format!(" {} ", normalize(text));
        for marker in &self.echo_markers {
            rest = rest.replace(&format!(" {} ", marker), " ");
        }
        normalize(&rest)
    }

    /// Parses a raw payload into text and issues, or `None` when malformed.
    pub fn parse(&self, raw: &str) -> Option<ParsedResponse> {
        let unfenced = RE_FENCE
            .captures(raw)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .unwrap_or(raw);
        let json = extract_json(unfenced)?;
        let payload: ModelPayload = serde_json::from_str(json).ok()?;

        let text = payload
            .text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty() && !is_null_literal(t));
        let issues = payload
            .errors
            .into_iter()
            .filter(|issue| !issue.word.trim().is_empty())
            .collect();

        Some(ParsedResponse { text, issues })
    }

    /// Queries the model for one frame until it answers usably or the retry
    /// budget runs out. Each call is bounded by `limit`.
    pub async fn validate_frame(
        &self,
        frame: &Frame,
        language: Language,
        vision: &dyn VisionModel,
        limit: Duration,
    ) -> FrameOutcome {
        let instruction = prompt::instruction(language);
        let instruction = instruction.as_str();
        let answered = AtomicBool::new(false);
        let answered = &answered;

        let outcome = attempt(self.max_retries, |number| async move {
            if number > 0 {
                debug!("Frame {} retry {}", frame.index, number);
            }
            let raw = match tokio::time::timeout(limit, vision.analyze_frame(frame, language)).await
            {
                Ok(Ok(raw)) => raw,
                Ok(Err(e)) => return Step::Retry(Rejection::Transport(e)),
                Err(_) => return Step::Retry(Rejection::Transport(InferenceError::Timeout(limit))),
            };
            answered.store(true, Ordering::Relaxed);

            match self.parse(&raw) {
                Some(parsed) => {
                    let echoed = parsed
                        .text
                        .as_deref()
                        .is_some_and(|t| self.is_echo(t, instruction));
                    if echoed {
                        Step::Done(FrameOutcome::Echo)
                    } else {
                        Step::Done(FrameOutcome::Accepted(AnalysisResult {
                            frame_index: frame.index,
                            timestamp: frame.timestamp,
                            text: parsed.text,
                            issues: parsed.issues,
                        }))
                    }
                }
                None if self.is_echo(&raw, instruction) => Step::Done(FrameOutcome::Echo),
                None => {
                    debug!(
                        "Frame {} malformed response: {}",
                        frame.index,
                        sanitize::preview(&raw, 80)
                    );
                    Step::Retry(Rejection::Malformed)
                }
            }
        })
        .await;

        match outcome {
            Ok(FrameOutcome::Echo) => {
                debug!("Frame {} dropped: instruction echo", frame.index);
                FrameOutcome::Echo
            }
            Ok(accepted) => accepted,
            Err(Exhausted {
                last: Rejection::Transport(e),
                ..
            }) if !answered.load(Ordering::Relaxed) => FrameOutcome::Unreachable(e),
            Err(Exhausted { attempts, .. }) => {
                warn!(
                    "Frame {} dropped after {} attempts without a usable response",
                    frame.index, attempts
                );
                FrameOutcome::Malformed { attempts }
            }
        }
    }
}

fn is_null_literal(text: &str) -> bool {
    text.eq_ignore_ascii_case("null") || text.eq_ignore_ascii_case("none")
}

/// First balanced `{...}` object in `response`, string-literal aware.
fn extract_json(response: &str) -> Option<&str> {
    let start = response.find('{')?;

    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in response[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => {
                escape_next = true;
            }
            '"' => {
                in_string = !in_string;
            }
            '{' if !in_string => {
                depth += 1;
            }
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&response[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }

    None
}
