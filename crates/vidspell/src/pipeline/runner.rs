use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, debug_span, error, info, info_span, warn, Instrument};

use crate::analysis::{
    CaptionAligner, Dictionary, FrameOutcome, ResponseValidator, SpellCrossValidator,
};
use crate::config::AnalysisConfig;
use crate::engine::{MediaExtractor, SpeechToText, VisionModel};
use crate::error::{ExtractionError, InferenceError, TranscriptionError};
use crate::job::{JobHandle, JobPhase};
use crate::report::Report;
use crate::sanitize;

use super::context::PipelineContext;
use super::error::{DropReason, PipelineError, PipelineWarning};

/// Awaits `fut`, mapping an elapsed `limit` to the collaborator's own timeout error.
async fn bounded<T, E, F>(limit: Duration, fut: F, on_timeout: fn(Duration) -> E) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout(limit)),
    }
}

/// Runs the four analysis phases for one job.
pub struct Pipeline {
    config: Arc<AnalysisConfig>,
    extractor: Arc<dyn MediaExtractor>,
    vision: Arc<dyn VisionModel>,
    speech: Arc<dyn SpeechToText>,
    validator: ResponseValidator,
    speller: SpellCrossValidator,
    aligner: CaptionAligner,
}

impl Pipeline {
    pub fn new(
        config: Arc<AnalysisConfig>,
        extractor: Arc<dyn MediaExtractor>,
        vision: Arc<dyn VisionModel>,
        speech: Arc<dyn SpeechToText>,
        dictionary: Arc<dyn Dictionary>,
    ) -> Self {
        let validator = ResponseValidator::from_config(&config);
        let aligner = CaptionAligner::from_config(&config);
        Self {
            config,
            extractor,
            vision,
            speech,
            validator,
            speller: SpellCrossValidator::new(dictionary),
            aligner,
        }
    }

    /// Drives `job` to `done` or `error`. Never returns an error itself; the
    /// outcome is recorded on the job.
    pub async fn run(&self, job: JobHandle, video: &Path) {
        let language = job.read(|j| j.language);
        let span = info_span!("pipeline",
            job_id = %job.id(),
            video = %sanitize::redact_path(video),
            language = %language,
        );

        async {
            match self.execute(&job, video).await {
                Ok(report) => {
                    let summary = report.summary.clone();
                    match job.update(|j| j.complete(report)) {
                        Ok(()) => info!(
                            analysed = summary.analysed_frames,
                            dropped = summary.dropped_frames,
                            issues = summary.issue_count,
                            "Job complete"
                        ),
                        Err(e) => error!("Failed to record job completion: {}", e),
                    }
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!(error = %message, "Job failed");
                    if let Err(te) = job.update(|j| j.fail(message)) {
                        error!("Failed to record job failure: {}", te);
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, job: &JobHandle, video: &Path) -> Result<Report, PipelineError> {
        self.check_cancelled(job)?;
        job.update(|j| j.start())?;

        let language = job.read(|j| j.language);
        let mut ctx = PipelineContext::new(video, language)?;

        self.step_health_check()
            .instrument(info_span!("health_check"))
            .await?;

        self.step_audio(&mut ctx).instrument(info_span!("audio")).await?;

        self.check_cancelled(job)?;
        job.update(|j| j.enter_phase(JobPhase::Frames))?;
        self.step_frames(&mut ctx, job)
            .instrument(info_span!("frames"))
            .await?;

        self.check_cancelled(job)?;
        job.update(|j| j.enter_phase(JobPhase::Analyse))?;
        self.step_analyse(&mut ctx, job)
            .instrument(info_span!("analyse"))
            .await?;

        self.check_cancelled(job)?;
        job.update(|j| j.enter_phase(JobPhase::Compare))?;
        let report = {
            let _step = info_span!("compare").entered();
            self.step_compare(ctx)
        };
        Ok(report)
    }

    fn check_cancelled(&self, job: &JobHandle) -> Result<(), PipelineError> {
        if job.is_cancel_requested() {
            return Err(PipelineError::Cancelled);
        }
        Ok(())
    }

    async fn step_health_check(&self) -> Result<(), PipelineError> {
        bounded(
            self.config.timeouts.health_check(),
            self.vision.health_check(),
            InferenceError::Timeout,
        )
        .await
        .map_err(PipelineError::VisionUnavailable)
    }

    async fn step_audio(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let audio_path = ctx.audio_path();

        bounded(
            self.config.timeouts.extraction(),
            self.extractor.extract_audio(&ctx.video, &audio_path),
            ExtractionError::Timeout,
        )
        .await
        .map_err(PipelineError::AudioExtraction)?;

        let segments = bounded(
            self.config.timeouts.transcription(),
            self.speech
                .transcribe(&audio_path, ctx.language.speech_hint()),
            TranscriptionError::Timeout,
        )
        .await?;

        ctx.segments = segments
            .into_iter()
            .filter(|s| !s.text.trim().is_empty())
            .collect();
        debug!("Transcribed {} speech segments", ctx.segments.len());
        Ok(())
    }

    async fn step_frames(
        &self,
        ctx: &mut PipelineContext,
        job: &JobHandle,
    ) -> Result<(), PipelineError> {
        let frames_dir = ctx.frames_dir();
        tokio::fs::create_dir_all(&frames_dir).await?;

        let frames = bounded(
            self.config.timeouts.extraction(),
            self.extractor.extract_frames(
                &ctx.video,
                self.config.frame_interval_secs,
                &frames_dir,
            ),
            ExtractionError::Timeout,
        )
        .await
        .map_err(PipelineError::FrameExtraction)?;

        ctx.frames = frames;
        let total = ctx.total_frames();
        job.update(|j| j.set_total_frames(total))?;
        debug!("Extracted {} frames", total);
        Ok(())
    }

    async fn step_analyse(
        &self,
        ctx: &mut PipelineContext,
        job: &JobHandle,
    ) -> Result<(), PipelineError> {
        let limit = self.config.timeouts.inference();

        for frame in &ctx.frames {
            self.check_cancelled(job)?;

            let outcome = self
                .validator
                .validate_frame(frame, ctx.language, self.vision.as_ref(), limit)
                .instrument(debug_span!("frame", index = frame.index))
                .await;

            let accepted = match outcome {
                FrameOutcome::Accepted(mut result) => {
                    result.issues = self.speller.filter(ctx.language, result.issues);
                    ctx.results.push(result);
                    true
                }
                FrameOutcome::Echo => {
                    ctx.warnings.push(PipelineWarning::FrameDropped {
                        index: frame.index,
                        reason: DropReason::Echo,
                    });
                    false
                }
                FrameOutcome::Malformed { attempts } => {
                    ctx.warnings.push(PipelineWarning::FrameDropped {
                        index: frame.index,
                        reason: DropReason::Malformed { attempts },
                    });
                    false
                }
                FrameOutcome::Unreachable(e) => return Err(PipelineError::VisionUnavailable(e)),
            };

            job.update(|j| j.frame_completed(accepted))?;
        }

        if !ctx.warnings.is_empty() {
            debug!("{} frames dropped", ctx.warnings.len());
        }
        Ok(())
    }

    fn step_compare(&self, ctx: PipelineContext) -> Report {
        let comparisons = self
            .aligner
            .align(&ctx.segments, &ctx.results, ctx.language);
        let total = ctx.total_frames();
        Report::build(ctx.language, total, ctx.results, ctx.segments, comparisons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_result_through() {
        let ok: Result<u8, ExtractionError> =
            bounded(Duration::from_secs(1), async { Ok(7) }, ExtractionError::Timeout).await;
        assert_eq!(ok.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_bounded_maps_elapsed_to_timeout() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<(), TranscriptionError>(())
        };
        let result = bounded(Duration::from_millis(20), slow, TranscriptionError::Timeout).await;
        assert!(matches!(result, Err(TranscriptionError::Timeout(_))));
    }

    #[test]
    fn test_cancelled_message() {
        assert_eq!(PipelineError::Cancelled.to_string(), "cancelled");
    }
}
