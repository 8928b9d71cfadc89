//! Seams to the external engines the pipeline drives: frame/audio extraction,
//! vision-language inference and speech-to-text.

pub mod ffmpeg;
pub mod ollama;
pub mod process;
pub mod whisper;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ExtractionError, InferenceError, TranscriptionError};
use crate::language::Language;

pub use ffmpeg::FfmpegExtractor;
pub use ollama::OllamaVisionModel;
pub use whisper::WhisperCliTranscriber;

/// A still image sampled from the video.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub index: u32,
    /// Seconds from video start.
    pub timestamp: f64,
    pub image: PathBuf,
}

/// A timestamped span of transcribed speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub language: String,
}

#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Samples one frame every `interval_secs` into `out_dir`, in timeline order.
    async fn extract_frames(
        &self,
        video: &Path,
        interval_secs: f64,
        out_dir: &Path,
    ) -> Result<Vec<Frame>, ExtractionError>;

    /// Writes the audio track of `video` to `out_path` as mono 16 kHz WAV.
    async fn extract_audio(&self, video: &Path, out_path: &Path) -> Result<(), ExtractionError>;
}

#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Returns the raw text payload the model produced for one frame.
    async fn analyze_frame(&self, frame: &Frame, language: Language)
        -> Result<String, InferenceError>;

    /// Fails when the service cannot be reached.
    async fn health_check(&self) -> Result<(), InferenceError>;
}

#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(
        &self,
        audio: &Path,
        language_hint: &str,
    ) -> Result<Vec<AudioSegment>, TranscriptionError>;
}
