//! Completion percentage and time-remaining estimates for polling clients.

use std::time::Duration;

use serde::Serialize;

use crate::config::ProgressConfig;
use crate::job::{JobPhase, JobStatus};

/// Estimated time remaining for the frame analysis phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Eta {
    /// Not enough completed frames (or elapsed time) to derive a rate.
    InsufficientData,
    /// Seconds remaining, never negative.
    Remaining { seconds: f64 },
}

impl Eta {
    pub fn seconds(&self) -> Option<f64> {
        match self {
            Eta::InsufficientData => None,
            Eta::Remaining { seconds } => Some(*seconds),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEstimate {
    /// Fraction of frames analysed, in [0, 1].
    pub fraction: f64,
    /// Frames per second, when measurable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    pub eta: Eta,
}

impl ProgressEstimate {
    fn idle() -> Self {
        Self {
            fraction: 0.0,
            rate: None,
            eta: Eta::InsufficientData,
        }
    }

    pub fn percent(&self) -> f64 {
        self.fraction * 100.0
    }
}

/// Estimates frame-analysis progress.
///
/// Only the `analyse` phase carries frame progress; every other phase reports
/// zero with no ETA.
pub fn estimate(
    phase: JobPhase,
    frames_done: u32,
    total_frames: u32,
    elapsed: Duration,
    config: &ProgressConfig,
) -> ProgressEstimate {
    if phase != JobPhase::Analyse || total_frames == 0 {
        return ProgressEstimate::idle();
    }

    let done = frames_done.min(total_frames);
    let fraction = f64::from(done) / f64::from(total_frames);
    let elapsed_secs = elapsed.as_secs_f64();

    let rate = if done > 0 && elapsed_secs > 0.0 {
        Some(f64::from(done) / elapsed_secs)
    } else {
        None
    };

    if done == total_frames {
        return ProgressEstimate {
            fraction,
            rate,
            eta: Eta::Remaining { seconds: 0.0 },
        };
    }

    if done < config.min_samples || elapsed < config.min_elapsed() || elapsed_secs <= 0.0 {
        return ProgressEstimate {
            fraction,
            rate,
            eta: Eta::InsufficientData,
        };
    }

    // remaining / (done / elapsed), rearranged to keep integers exact
    let remaining = f64::from(total_frames - done);
    let seconds = (remaining * elapsed_secs / f64::from(done)).max(0.0);

    ProgressEstimate {
        fraction,
        rate,
        eta: Eta::Remaining { seconds },
    }
}

/// Whole-job percentage for display, using fixed bands per phase.
pub fn overall_percent(status: JobStatus, phase: JobPhase, fraction: f64) -> u8 {
    match status {
        JobStatus::Queued => 0,
        JobStatus::Done => 100,
        JobStatus::Running | JobStatus::Error => match phase {
            JobPhase::Audio => 3,
            JobPhase::Frames => 12,
            JobPhase::Analyse => 15 + (fraction.clamp(0.0, 1.0) * 72.0) as u8,
            JobPhase::Compare => 90,
            JobPhase::Done => 100,
        },
    }
}
