use std::path::PathBuf;

use tempfile::TempDir;

use crate::analysis::AnalysisResult;
use crate::engine::{AudioSegment, Frame};
use crate::language::Language;

use super::error::PipelineWarning;

pub struct PipelineContext {
    // Input
    pub video: PathBuf,
    pub language: Language,

    // Frames and audio for this job; removed when the context drops
    workspace: TempDir,

    // Audio phase result
    pub segments: Vec<AudioSegment>,

    // Frames phase result, in timeline order
    pub frames: Vec<Frame>,

    // Analyse phase result, one per accepted frame
    pub results: Vec<AnalysisResult>,

    // Non-fatal warnings
    pub warnings: Vec<PipelineWarning>,
}

impl PipelineContext {
    pub fn new(video: impl Into<PathBuf>, language: Language) -> std::io::Result<Self> {
        let workspace = tempfile::Builder::new().prefix("vidspell-").tempdir()?;
        Ok(Self {
            video: video.into(),
            language,
            workspace,
            segments: Vec::new(),
            frames: Vec::new(),
            results: Vec::new(),
            warnings: Vec::new(),
        })
    }

    pub fn audio_path(&self) -> PathBuf {
        self.workspace.path().join("audio.wav")
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.workspace.path().join("frames")
    }

    pub fn total_frames(&self) -> u32 {
        self.frames.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_removed_on_drop() {
        let ctx = PipelineContext::new("/videos/clip.mp4", Language::En).unwrap();
        let workspace = ctx.workspace.path().to_path_buf();
        assert!(workspace.is_dir());
        assert!(ctx.audio_path().starts_with(&workspace));
        assert!(ctx.frames_dir().starts_with(&workspace));

        drop(ctx);
        assert!(!workspace.exists());
    }
}
