use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use super::process::run_with_timeout;
use super::{Frame, MediaExtractor};
use crate::config::AnalysisConfig;
use crate::error::ExtractionError;
use crate::sanitize;

const FRAME_PREFIX: &str = "frame_";

/// Frame and audio extraction through the `ffmpeg` command-line tool.
pub struct FfmpegExtractor {
    binary: String,
    timeout: Duration,
}

impl FfmpegExtractor {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.ffmpeg.binary.clone(), config.timeouts.extraction())
    }

    fn frame_args(video: &Path, interval_secs: f64, out_dir: &Path) -> Vec<String> {
        vec![
            "-i".to_string(),
            video.display().to_string(),
            "-vf".to_string(),
            format!("fps={}", 1.0 / interval_secs),
            out_dir
                .join(format!("{}%04d.jpg", FRAME_PREFIX))
                .display()
                .to_string(),
            "-y".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
        ]
    }

    fn audio_args(video: &Path, out_path: &Path) -> Vec<String> {
        vec![
            "-i".to_string(),
            video.display().to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "-ar".to_string(),
            "16000".to_string(),
            "-vn".to_string(),
            out_path.display().to_string(),
            "-y".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
        ]
    }
}

/// Lists extracted frame images in timeline order.
fn collect_frame_paths(out_dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let pattern = out_dir.join(format!("{}*.jpg", FRAME_PREFIX));
    let pattern = pattern.to_string_lossy();

    let mut paths: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| ExtractionError::Pattern(e.to_string()))?
        .filter_map(|entry| entry.ok())
        .collect();
    // zero-padded names sort in timeline order
    paths.sort();
    Ok(paths)
}

/// Assigns indices and timestamps to sorted frame images.
pub fn frames_from_paths(paths: Vec<PathBuf>, interval_secs: f64) -> Vec<Frame> {
    paths
        .into_iter()
        .enumerate()
        .map(|(i, image)| Frame {
            index: i as u32,
            timestamp: i as f64 * interval_secs,
            image,
        })
        .collect()
}

#[async_trait]
impl MediaExtractor for FfmpegExtractor {
    async fn extract_frames(
        &self,
        video: &Path,
        interval_secs: f64,
        out_dir: &Path,
    ) -> Result<Vec<Frame>, ExtractionError> {
        let args = Self::frame_args(video, interval_secs, out_dir);
        run_with_timeout(&self.binary, &args, self.timeout)
            .await
            .map_err(|f| f.into_extraction_error(&self.binary))?;

        let paths = collect_frame_paths(out_dir)?;
        if paths.is_empty() {
            return Err(ExtractionError::NoFrames);
        }

        debug!(
            "Extracted {} frames from {}",
            paths.len(),
            sanitize::redact_path(video)
        );
        Ok(frames_from_paths(paths, interval_secs))
    }

    async fn extract_audio(&self, video: &Path, out_path: &Path) -> Result<(), ExtractionError> {
        let args = Self::audio_args(video, out_path);
        run_with_timeout(&self.binary, &args, self.timeout)
            .await
            .map_err(|f| f.into_extraction_error(&self.binary))?;
        Ok(())
    }
}
