//! Fake collaborators with scripted behaviour.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use vidspell::error::{ExtractionError, InferenceError, TranscriptionError};
use vidspell::{AudioSegment, Frame, Language, MediaExtractor, SpeechToText, VisionModel};

/// Produces `frame_count` frames without touching ffmpeg.
pub struct FakeExtractor {
    pub frame_count: u32,
    pub fail_audio: bool,
    pub fail_frames: bool,
}

impl FakeExtractor {
    pub fn with_frames(frame_count: u32) -> Self {
        Self {
            frame_count,
            fail_audio: false,
            fail_frames: false,
        }
    }
}

#[async_trait]
impl MediaExtractor for FakeExtractor {
    async fn extract_frames(
        &self,
        _video: &Path,
        interval_secs: f64,
        out_dir: &Path,
    ) -> Result<Vec<Frame>, ExtractionError> {
        if self.fail_frames {
            return Err(ExtractionError::ExitStatus {
                program: "ffmpeg".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "Invalid data found when processing input".to_string(),
            });
        }
        if self.frame_count == 0 {
            return Err(ExtractionError::NoFrames);
        }
        Ok((0..self.frame_count)
            .map(|i| Frame {
                index: i,
                timestamp: i as f64 * interval_secs,
                image: out_dir.join(format!("frame_{:04}.jpg", i + 1)),
            })
            .collect())
    }

    async fn extract_audio(&self, _video: &Path, _out_path: &Path) -> Result<(), ExtractionError> {
        if self.fail_audio {
            return Err(ExtractionError::ExitStatus {
                program: "ffmpeg".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "Output file does not contain any stream".to_string(),
            });
        }
        Ok(())
    }
}

/// One scripted vision reply.
#[derive(Clone)]
pub enum Reply {
    Raw(String),
    Unavailable,
}

impl Reply {
    pub fn json(text: &str, errors: &[(&str, &str)]) -> Self {
        let errors: Vec<serde_json::Value> = errors
            .iter()
            .map(|(word, suggestion)| {
                serde_json::json!({ "word": word, "suggestion": suggestion, "context": text })
            })
            .collect();
        Reply::Raw(serde_json::json!({ "text": text, "errors": errors }).to_string())
    }

    pub fn raw(body: &str) -> Self {
        Reply::Raw(body.to_string())
    }
}

/// Replies per frame index, consumed in order; frames without a script get
/// the default reply.
pub struct ScriptedVision {
    scripts: Mutex<HashMap<u32, Vec<Reply>>>,
    default_reply: Reply,
    healthy: bool,
    delay: Duration,
    calls: Mutex<HashMap<u32, u32>>,
}

impl ScriptedVision {
    pub fn new(default_reply: Reply) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            default_reply,
            healthy: true,
            delay: Duration::ZERO,
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn script(self, frame: u32, replies: Vec<Reply>) -> Self {
        self.scripts.lock().unwrap().insert(frame, replies);
        self
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls_for(&self, frame: u32) -> u32 {
        self.calls.lock().unwrap().get(&frame).copied().unwrap_or(0)
    }
}

#[async_trait]
impl VisionModel for ScriptedVision {
    async fn analyze_frame(
        &self,
        frame: &Frame,
        _language: Language,
    ) -> Result<String, InferenceError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        *self.calls.lock().unwrap().entry(frame.index).or_insert(0) += 1;

        let reply = {
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(&frame.index) {
                Some(replies) if !replies.is_empty() => replies.remove(0),
                _ => self.default_reply.clone(),
            }
        };

        match reply {
            Reply::Raw(body) => Ok(body),
            Reply::Unavailable => Err(InferenceError::Unreachable {
                url: "http://localhost:11434/api/chat".to_string(),
                reason: "connection refused".to_string(),
            }),
        }
    }

    async fn health_check(&self) -> Result<(), InferenceError> {
        if self.healthy {
            Ok(())
        } else {
            Err(InferenceError::Unreachable {
                url: "http://localhost:11434/api/tags".to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }
}

/// Returns fixed segments, optionally after a delay.
pub struct FakeSpeech {
    pub segments: Vec<AudioSegment>,
    pub delay: Duration,
    pub hints: Mutex<Vec<String>>,
}

impl FakeSpeech {
    pub fn new(segments: &[(f64, f64, &str)]) -> Self {
        Self {
            segments: segments
                .iter()
                .map(|(start, end, text)| AudioSegment {
                    start: *start,
                    end: *end,
                    text: text.to_string(),
                    language: String::new(),
                })
                .collect(),
            delay: Duration::ZERO,
            hints: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl SpeechToText for FakeSpeech {
    async fn transcribe(
        &self,
        _audio: &Path,
        language_hint: &str,
    ) -> Result<Vec<AudioSegment>, TranscriptionError> {
        self.hints.lock().unwrap().push(language_hint.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self
            .segments
            .iter()
            .cloned()
            .map(|mut s| {
                s.language = language_hint.to_string();
                s
            })
            .collect())
    }
}
