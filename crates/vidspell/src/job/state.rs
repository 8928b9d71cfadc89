//! Job record and its state machine.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ProgressConfig;
use crate::language::Language;
use crate::progress::{self, ProgressEstimate};
use crate::report::Report;

/// Overall job status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Done => write!(f, "done"),
            JobStatus::Error => write!(f, "error"),
        }
    }
}

/// Analysis phase. Variants are declared in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Audio,
    Frames,
    Analyse,
    Compare,
    Done,
}

impl JobPhase {
    /// Human-readable activity shown to pollers.
    pub fn describe(&self) -> &'static str {
        match self {
            JobPhase::Audio => "Transcribing audio",
            JobPhase::Frames => "Extracting frames",
            JobPhase::Analyse => "Analysing frames",
            JobPhase::Compare => "Comparing captions with audio",
            JobPhase::Done => "Complete",
        }
    }

    /// The phase that follows this one, `None` after done.
    pub fn next(&self) -> Option<JobPhase> {
        match self {
            JobPhase::Audio => Some(JobPhase::Frames),
            JobPhase::Frames => Some(JobPhase::Analyse),
            JobPhase::Analyse => Some(JobPhase::Compare),
            JobPhase::Compare => Some(JobPhase::Done),
            JobPhase::Done => None,
        }
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobPhase::Audio => write!(f, "audio"),
            JobPhase::Frames => write!(f, "frames"),
            JobPhase::Analyse => write!(f, "analyse"),
            JobPhase::Compare => write!(f, "compare"),
            JobPhase::Done => write!(f, "done"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Job is {status}, expected {expected}")]
    WrongStatus {
        status: JobStatus,
        expected: JobStatus,
    },

    #[error("Cannot move from phase {from} to {to}")]
    OutOfOrder { from: JobPhase, to: JobPhase },

    #[error("Operation not valid in phase {0}")]
    WrongPhase(JobPhase),

    #[error("Total frame count is already fixed at {0}")]
    TotalAlreadySet(u32),

    #[error("Total frame count has not been fixed")]
    TotalNotSet,

    #[error("Frame count would exceed total ({total})")]
    FrameOverflow { total: u32 },
}

/// One submitted analysis. Mutated only through the state machine methods.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    /// File name of the submitted video, without its directory.
    pub video_name: String,
    pub language: Language,
    pub status: JobStatus,
    pub phase: JobPhase,
    pub frames_done: u32,
    pub total_frames: u32,
    total_fixed: bool,
    /// Frames whose response was accepted so far.
    pub frames_accepted: u32,
    pub message: String,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    analyse_started: Option<Instant>,
    pub cancel_requested: bool,
    pub report: Option<Arc<Report>>,
}

impl Job {
    pub fn new(id: impl Into<String>, video_name: impl Into<String>, language: Language) -> Self {
        Self {
            id: id.into(),
            video_name: video_name.into(),
            language,
            status: JobStatus::Queued,
            phase: JobPhase::Audio,
            frames_done: 0,
            total_frames: 0,
            total_fixed: false,
            frames_accepted: 0,
            message: "Queued".to_string(),
            error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            analyse_started: None,
            cancel_requested: false,
            report: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn expect_running(&self) -> Result<(), TransitionError> {
        if self.status != JobStatus::Running {
            return Err(TransitionError::WrongStatus {
                status: self.status,
                expected: JobStatus::Running,
            });
        }
        Ok(())
    }

    /// queued → running(audio).
    pub fn start(&mut self) -> Result<(), TransitionError> {
        if self.status != JobStatus::Queued {
            return Err(TransitionError::WrongStatus {
                status: self.status,
                expected: JobStatus::Queued,
            });
        }
        self.status = JobStatus::Running;
        self.phase = JobPhase::Audio;
        self.started_at = Some(Utc::now());
        self.message = JobPhase::Audio.describe().to_string();
        Ok(())
    }

    /// Moves to the immediately following phase, resetting phase-local
    /// counters. Done is reached only through [`Job::complete`].
    pub fn enter_phase(&mut self, phase: JobPhase) -> Result<(), TransitionError> {
        self.expect_running()?;
        if self.phase.next() != Some(phase) || phase == JobPhase::Done {
            return Err(TransitionError::OutOfOrder {
                from: self.phase,
                to: phase,
            });
        }

        match phase {
            JobPhase::Frames => self.frames_done = 0,
            JobPhase::Analyse => {
                if !self.total_fixed {
                    return Err(TransitionError::TotalNotSet);
                }
                self.frames_done = 0;
                self.frames_accepted = 0;
                self.analyse_started = Some(Instant::now());
            }
            _ => {}
        }
        self.phase = phase;
        self.message = phase.describe().to_string();
        Ok(())
    }

    /// Fixes the frame count at the end of extraction.
    pub fn set_total_frames(&mut self, total: u32) -> Result<(), TransitionError> {
        self.expect_running()?;
        if self.phase != JobPhase::Frames {
            return Err(TransitionError::WrongPhase(self.phase));
        }
        if self.total_fixed {
            return Err(TransitionError::TotalAlreadySet(self.total_frames));
        }
        self.total_frames = total;
        self.total_fixed = true;
        self.message = format!("Extracted {} frames", total);
        Ok(())
    }

    /// Counts one processed frame, whether kept or dropped.
    pub fn frame_completed(&mut self, accepted: bool) -> Result<(), TransitionError> {
        self.expect_running()?;
        if self.phase != JobPhase::Analyse {
            return Err(TransitionError::WrongPhase(self.phase));
        }
        if self.frames_done >= self.total_frames {
            return Err(TransitionError::FrameOverflow {
                total: self.total_frames,
            });
        }
        self.frames_done += 1;
        if accepted {
            self.frames_accepted += 1;
        }
        self.message = format!(
            "Analysing frame {} of {}",
            self.frames_done, self.total_frames
        );
        Ok(())
    }

    /// running(compare) → done.
    pub fn complete(&mut self, report: Report) -> Result<(), TransitionError> {
        self.expect_running()?;
        if self.phase != JobPhase::Compare {
            return Err(TransitionError::WrongPhase(self.phase));
        }
        self.status = JobStatus::Done;
        self.phase = JobPhase::Done;
        self.report = Some(Arc::new(report));
        self.finished_at = Some(Utc::now());
        self.message = JobPhase::Done.describe().to_string();
        Ok(())
    }

    /// Any non-terminal state → error. The phase stays where the failure happened.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::WrongStatus {
                status: self.status,
                expected: JobStatus::Running,
            });
        }
        let message = message.into();
        self.status = JobStatus::Error;
        self.finished_at = Some(Utc::now());
        self.message = format!("Failed: {}", message);
        self.error = Some(message);
        Ok(())
    }

    pub fn progress(&self, config: &ProgressConfig) -> ProgressEstimate {
        let elapsed = self
            .analyse_started
            .map(|started| started.elapsed())
            .unwrap_or_default();
        progress::estimate(
            self.phase,
            self.frames_done,
            self.total_frames,
            elapsed,
            config,
        )
    }

    pub fn view(&self, config: &ProgressConfig) -> JobView {
        let progress = self.progress(config);
        JobView {
            job_id: self.id.clone(),
            video_name: self.video_name.clone(),
            language: self.language,
            status: self.status,
            phase: self.phase,
            frames_done: self.frames_done,
            total_frames: self.total_frames,
            frames_accepted: self.frames_accepted,
            percent: progress::overall_percent(self.status, self.phase, progress.fraction),
            progress,
            message: self.message.clone(),
            error: self.error.clone(),
            cancel_requested: self.cancel_requested,
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

/// Read-only copy of a job handed to pollers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub job_id: String,
    pub video_name: String,
    pub language: Language,
    pub status: JobStatus,
    pub phase: JobPhase,
    pub frames_done: u32,
    pub total_frames: u32,
    /// Analysed frames with a usable response; dropped frames are not counted.
    pub frames_accepted: u32,
    /// Whole-job percentage, 0-100.
    pub percent: u8,
    pub progress: ProgressEstimate,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub cancel_requested: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}
