//! Asynchronous video caption analysis.
//!
//! A submitted video goes through four phases on a background task: audio
//! transcription, frame extraction, per-frame on-screen text and spelling
//! analysis, and a comparison of spoken against displayed text. Callers poll
//! [`Orchestrator::snapshot`] for progress and fetch the [`Report`] when done.

pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod job;
pub mod language;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod sanitize;
pub mod telemetry;

pub use analysis::{AnalysisResult, ComparisonEntry, SpellingIssue, Verdict};
pub use config::{load_config, AnalysisConfig};
pub use engine::{AudioSegment, Frame, MediaExtractor, SpeechToText, VisionModel};
pub use error::{Result, ResultError, VidspellError};
pub use job::{JobPhase, JobProgressEvent, JobStatus, JobView};
pub use language::Language;
pub use orchestrator::Orchestrator;
pub use progress::{Eta, ProgressEstimate};
pub use report::{IssueEntry, Report, ReportSummary};
