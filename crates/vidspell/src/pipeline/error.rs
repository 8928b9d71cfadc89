use thiserror::Error;

use crate::error::{ExtractionError, InferenceError, TranscriptionError};
use crate::job::TransitionError;

/// Fatal job errors. Any of these ends the job in `error`.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Vision service unavailable: {0}")]
    VisionUnavailable(InferenceError),

    #[error("Audio extraction failed: {0}")]
    AudioExtraction(ExtractionError),

    #[error("Frame extraction failed: {0}")]
    FrameExtraction(ExtractionError),

    #[error("Transcription failed: {0}")]
    Transcription(#[from] TranscriptionError),

    #[error("Invalid job transition: {0}")]
    State(#[from] TransitionError),

    #[error("Failed to prepare job workspace: {0}")]
    Workspace(#[from] std::io::Error),

    #[error("cancelled")]
    Cancelled,
}

/// Why a frame contributed no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Echo,
    Malformed { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineWarning {
    FrameDropped { index: u32, reason: DropReason },
}
