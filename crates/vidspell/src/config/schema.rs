use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_version")]
    pub version: String,
    /// Seconds of video covered by each sampled frame.
    #[serde(default = "default_frame_interval")]
    pub frame_interval_secs: f64,
    /// Word list used to cross-check English spelling flags.
    #[serde(default)]
    pub dictionary_path: Option<PathBuf>,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub whisper: WhisperConfig,
    #[serde(default)]
    pub ffmpeg: FfmpegConfig,
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_frame_interval() -> f64 {
    2.0
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            frame_interval_secs: default_frame_interval(),
            dictionary_path: None,
            ollama: OllamaConfig::default(),
            whisper: WhisperConfig::default(),
            ffmpeg: FfmpegConfig::default(),
            thresholds: ThresholdsConfig::default(),
            validation: ValidationConfig::default(),
            progress: ProgressConfig::default(),
            timeouts: TimeoutsConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Applies `OLLAMA_BASE_URL` / `OLLAMA_MODEL` overrides from the environment.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
            if !url.trim().is_empty() {
                self.ollama.base_url = url;
            }
        }
        if let Ok(model) = std::env::var("OLLAMA_MODEL") {
            if !model.trim().is_empty() {
                self.ollama.model = model;
            }
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "video-spellcheck".to_string()
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
            model: default_ollama_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperConfig {
    #[serde(default = "default_whisper_binary")]
    pub binary: String,
    #[serde(default = "default_whisper_model")]
    pub model_path: PathBuf,
    #[serde(default = "default_beam_size")]
    pub beam_size: u32,
}

fn default_whisper_binary() -> String {
    "whisper-cli".to_string()
}

fn default_whisper_model() -> PathBuf {
    PathBuf::from("models/ggml-small.bin")
}

fn default_beam_size() -> u32 {
    3
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            binary: default_whisper_binary(),
            model_path: default_whisper_model(),
            beam_size: default_beam_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FfmpegConfig {
    #[serde(default = "default_ffmpeg_binary")]
    pub binary: String,
}

fn default_ffmpeg_binary() -> String {
    "ffmpeg".to_string()
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            binary: default_ffmpeg_binary(),
        }
    }
}

/// Heuristic similarity thresholds, all in (0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdsConfig {
    #[serde(default = "default_echo_similarity")]
    pub echo_similarity: f64,
    #[serde(default = "default_match")]
    pub match_ratio: f64,
    #[serde(default = "default_partial")]
    pub partial_overlap: f64,
}

fn default_echo_similarity() -> f64 {
    0.8
}

fn default_match() -> f64 {
    0.55
}

fn default_partial() -> f64 {
    0.5
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            echo_similarity: default_echo_similarity(),
            match_ratio: default_match(),
            partial_overlap: default_partial(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_echo_markers")]
    pub echo_markers: Vec<String>,
    #[serde(default = "default_marker_hits")]
    pub echo_marker_min_hits: usize,
}

fn default_max_retries() -> u32 {
    2
}

fn default_echo_markers() -> Vec<String> {
    [
        "spell-checker",
        "spell checker",
        "video frame",
        "json object",
        "no explanation",
        "no markdown",
        "reply with",
        "reply in json",
        "look at this",
        "lower thirds",
        "graphics, etc",
        "you are a",
        "on-screen text",
        "misspelled",
        "surrounding words",
    ]
    .iter()
    .map(|m| m.to_string())
    .collect()
}

fn default_marker_hits() -> usize {
    2
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            echo_markers: default_echo_markers(),
            echo_marker_min_hits: default_marker_hits(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    #[serde(default = "default_min_samples")]
    pub min_samples: u32,
    #[serde(default = "default_min_elapsed_ms")]
    pub min_elapsed_ms: u64,
}

fn default_min_samples() -> u32 {
    3
}

fn default_min_elapsed_ms() -> u64 {
    500
}

impl ProgressConfig {
    pub fn min_elapsed(&self) -> Duration {
        Duration::from_millis(self.min_elapsed_ms)
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            min_samples: default_min_samples(),
            min_elapsed_ms: default_min_elapsed_ms(),
        }
    }
}

/// Upper bounds for each collaborator call, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_health_timeout")]
    pub health_check_secs: u64,
    #[serde(default = "default_extraction_timeout")]
    pub extraction_secs: u64,
    #[serde(default = "default_transcription_timeout")]
    pub transcription_secs: u64,
    #[serde(default = "default_inference_timeout")]
    pub inference_secs: u64,
}

fn default_health_timeout() -> u64 {
    5
}

fn default_extraction_timeout() -> u64 {
    600
}

fn default_transcription_timeout() -> u64 {
    1800
}

fn default_inference_timeout() -> u64 {
    120
}

impl TimeoutsConfig {
    pub fn health_check(&self) -> Duration {
        Duration::from_secs(self.health_check_secs)
    }

    pub fn extraction(&self) -> Duration {
        Duration::from_secs(self.extraction_secs)
    }

    pub fn transcription(&self) -> Duration {
        Duration::from_secs(self.transcription_secs)
    }

    pub fn inference(&self) -> Duration {
        Duration::from_secs(self.inference_secs)
    }
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            health_check_secs: default_health_timeout(),
            extraction_secs: default_extraction_timeout(),
            transcription_secs: default_transcription_timeout(),
            inference_secs: default_inference_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.frame_interval_secs, 2.0);
        assert_eq!(config.validation.max_retries, 2);
        assert_eq!(config.thresholds.match_ratio, 0.55);
        assert_eq!(config.progress.min_elapsed(), Duration::from_millis(500));
        assert_eq!(config.timeouts.health_check(), Duration::from_secs(5));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var("OLLAMA_BASE_URL", "http://gpu-box:11434");
        std::env::set_var("OLLAMA_MODEL", "llava:13b");

        let config = AnalysisConfig::default().with_env_overrides();
        assert_eq!(config.ollama.base_url, "http://gpu-box:11434");
        assert_eq!(config.ollama.model, "llava:13b");

        std::env::remove_var("OLLAMA_BASE_URL");
        std::env::remove_var("OLLAMA_MODEL");
    }

    #[test]
    #[serial]
    fn test_blank_env_override_is_ignored() {
        std::env::set_var("OLLAMA_MODEL", "  ");
        let config = AnalysisConfig::default().with_env_overrides();
        assert_eq!(config.ollama.model, "video-spellcheck");
        std::env::remove_var("OLLAMA_MODEL");
    }
}
