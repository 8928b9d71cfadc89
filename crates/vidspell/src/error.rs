use std::path::PathBuf;
use thiserror::Error;

use crate::job::{JobPhase, JobStatus};

#[derive(Error, Debug)]
pub enum VidspellError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Vision client error: {0}")]
    Vision(#[from] InferenceError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Failed to read dictionary '{path}': {source}")]
    Dictionary {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the frame/audio extraction utility.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {status}: {stderr}")]
    ExitStatus {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Could not extract any frames. Is this a valid video file?")]
    NoFrames,

    #[error("Invalid frame pattern: {0}")]
    Pattern(String),

    #[error("Extraction timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Failures of the vision-language inference service.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Cannot reach vision service at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("Vision service returned HTTP {status}")]
    Status { status: u16 },

    #[error("Failed to read frame image '{path}': {source}")]
    ReadImage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Inference timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Failures of the speech-to-text engine.
#[derive(Error, Debug)]
pub enum TranscriptionError {
    #[error("Failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {status}: {stderr}")]
    ExitStatus {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Transcription output missing: {0}")]
    MissingOutput(PathBuf),

    #[error("Failed to parse transcription output: {0}")]
    Parse(String),

    #[error("Transcription timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Why a job's report could not be returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResultError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job is not finished (status: {status}, phase: {phase})")]
    NotReady { status: JobStatus, phase: JobPhase },

    #[error("Job failed: {0}")]
    Failed(String),
}

pub type Result<T> = std::result::Result<T, VidspellError>;
