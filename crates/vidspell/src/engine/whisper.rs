use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde_json::Value;

use super::process::run_with_timeout;
use super::{AudioSegment, SpeechToText};
use crate::config::AnalysisConfig;
use crate::error::TranscriptionError;

/// Speech-to-text through a whisper.cpp style CLI writing JSON output.
pub struct WhisperCliTranscriber {
    binary: String,
    model_path: PathBuf,
    beam_size: u32,
    timeout: Duration,
}

impl WhisperCliTranscriber {
    pub fn new(
        binary: impl Into<String>,
        model_path: impl Into<PathBuf>,
        beam_size: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            binary: binary.into(),
            model_path: model_path.into(),
            beam_size,
            timeout,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            config.whisper.binary.clone(),
            config.whisper.model_path.clone(),
            config.whisper.beam_size,
            config.timeouts.transcription(),
        )
    }

    fn build_args(&self, audio: &Path, language_hint: &str, output_prefix: &Path) -> Vec<String> {
        vec![
            "-m".to_string(),
            self.model_path.display().to_string(),
            "-f".to_string(),
            audio.display().to_string(),
            "-l".to_string(),
            language_hint.to_string(),
            "-bs".to_string(),
            self.beam_size.to_string(),
            "-oj".to_string(),
            "-of".to_string(),
            output_prefix.display().to_string(),
        ]
    }
}

fn output_prefix(audio: &Path) -> PathBuf {
    let stem = audio
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "audio".to_string());
    audio.with_file_name(format!("{}_transcript", stem))
}

/// Reads segments from whisper JSON output.
///
/// Accepts whisper.cpp's `transcription[].offsets` (milliseconds) as well as
/// the `segments[].start/end` (seconds) layout. Blank segments are dropped.
pub fn parse_segments(root: &Value, language: &str) -> Vec<AudioSegment> {
    let nodes = root
        .get("transcription")
        .or_else(|| root.get("segments"))
        .and_then(Value::as_array);

    let Some(nodes) = nodes else {
        return Vec::new();
    };

    nodes
        .iter()
        .filter_map(|node| {
            let text = node
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string();
            if text.is_empty() {
                return None;
            }
            let start = segment_bound(node, "/offsets/from", "start")?;
            let end = segment_bound(node, "/offsets/to", "end").unwrap_or(start);
            Some(AudioSegment {
                start,
                end: end.max(start),
                text,
                language: language.to_string(),
            })
        })
        .collect()
}

fn segment_bound(node: &Value, millis_pointer: &str, secs_key: &str) -> Option<f64> {
    if let Some(value) = node.pointer(millis_pointer) {
        return number_to_secs(value).map(|ms| ms / 1_000.0);
    }
    node.get(secs_key).and_then(number_to_secs)
}

fn number_to_secs(value: &Value) -> Option<f64> {
    value.as_f64().or_else(|| value.as_i64().map(|v| v as f64))
}

#[async_trait]
impl SpeechToText for WhisperCliTranscriber {
    async fn transcribe(
        &self,
        audio: &Path,
        language_hint: &str,
    ) -> Result<Vec<AudioSegment>, TranscriptionError> {
        let prefix = output_prefix(audio);
        let args = self.build_args(audio, language_hint, &prefix);

        run_with_timeout(&self.binary, &args, self.timeout)
            .await
            .map_err(|f| f.into_transcription_error(&self.binary))?;

        let json_path = PathBuf::from(format!("{}.json", prefix.display()));
        let content = tokio::fs::read_to_string(&json_path)
            .await
            .map_err(|_| TranscriptionError::MissingOutput(json_path.clone()))?;
        let raw: Value =
            serde_json::from_str(&content).map_err(|e| TranscriptionError::Parse(e.to_string()))?;

        let segments = parse_segments(&raw, language_hint);
        debug!("Transcribed {} speech segments", segments.len());
        Ok(segments)
    }
}
