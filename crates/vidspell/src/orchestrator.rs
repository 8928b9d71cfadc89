//! Public entry point: submits jobs, runs them in the background and answers
//! progress and result queries.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{info, warn};
use tokio::sync::broadcast;

use crate::analysis::{Dictionary, WordListDictionary};
use crate::config::AnalysisConfig;
use crate::engine::{
    FfmpegExtractor, MediaExtractor, OllamaVisionModel, SpeechToText, VisionModel,
    WhisperCliTranscriber,
};
use crate::error::{self, ResultError};
use crate::job::{JobProgressEvent, JobRegistry, JobStatus, JobView, RemoveError};
use crate::language::Language;
use crate::pipeline::Pipeline;
use crate::report::Report;
use crate::sanitize;

const EVENT_CAPACITY: usize = 256;

pub struct Orchestrator {
    registry: Arc<JobRegistry>,
    pipeline: Arc<Pipeline>,
}

impl Orchestrator {
    pub fn new(
        config: AnalysisConfig,
        extractor: Arc<dyn MediaExtractor>,
        vision: Arc<dyn VisionModel>,
        speech: Arc<dyn SpeechToText>,
        dictionary: Arc<dyn Dictionary>,
    ) -> Self {
        let registry = Arc::new(JobRegistry::new(config.progress.clone(), EVENT_CAPACITY));
        let pipeline = Arc::new(Pipeline::new(
            Arc::new(config),
            extractor,
            vision,
            speech,
            dictionary,
        ));
        Self { registry, pipeline }
    }

    /// Production constructor: ffmpeg, Ollama and whisper-cli adapters.
    /// `OLLAMA_BASE_URL` and `OLLAMA_MODEL` override the configured service.
    pub fn from_config(config: AnalysisConfig) -> error::Result<Self> {
        let config = config.with_env_overrides();
        let dictionary = match &config.dictionary_path {
            Some(path) => WordListDictionary::from_path(path)?,
            None => {
                warn!("No dictionary configured; English spelling flags are not cross-checked");
                WordListDictionary::from_words(std::iter::empty::<&str>())
            }
        };
        let extractor = FfmpegExtractor::from_config(&config);
        let vision = OllamaVisionModel::from_config(&config)?;
        let speech = WhisperCliTranscriber::from_config(&config);

        Ok(Self::new(
            config,
            Arc::new(extractor),
            Arc::new(vision),
            Arc::new(speech),
            Arc::new(dictionary),
        ))
    }

    /// Registers a job and starts it on a background task. Returns immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, video: impl AsRef<Path>, language: Language) -> String {
        let video = video.as_ref().to_path_buf();
        let handle = self
            .registry
            .create(&sanitize::redact_path(&video), language);
        let job_id = handle.id().to_string();
        info!("Submitted job {} ({})", job_id, language);

        let pipeline = Arc::clone(&self.pipeline);
        tokio::spawn(async move {
            pipeline.run(handle, &video).await;
        });

        job_id
    }

    pub fn snapshot(&self, job_id: &str) -> Option<JobView> {
        self.registry.snapshot(job_id)
    }

    /// The finished report, or why there is none.
    pub fn result(&self, job_id: &str) -> Result<Arc<Report>, ResultError> {
        let handle = self
            .registry
            .get(job_id)
            .ok_or_else(|| ResultError::NotFound(job_id.to_string()))?;

        handle.read(|job| match (job.status, &job.report) {
            (JobStatus::Done, Some(report)) => Ok(Arc::clone(report)),
            (JobStatus::Error, _) => Err(ResultError::Failed(
                job.error.clone().unwrap_or_else(|| "unknown error".to_string()),
            )),
            (status, _) => Err(ResultError::NotReady {
                status,
                phase: job.phase,
            }),
        })
    }

    /// Drops a finished or failed job from the registry. Jobs are kept until
    /// forgotten or swept with [`Orchestrator::sweep_finished`].
    pub fn forget(&self, job_id: &str) -> Result<(), ResultError> {
        self.registry
            .remove_terminal(job_id)
            .map_err(|e| match e {
                RemoveError::NotFound => ResultError::NotFound(job_id.to_string()),
                RemoveError::NotTerminal { status, phase } => {
                    ResultError::NotReady { status, phase }
                }
            })
    }

    /// Asks a job to stop at the next frame boundary. Returns `false` when the
    /// job already finished.
    pub fn cancel(&self, job_id: &str) -> Result<bool, ResultError> {
        let handle = self
            .registry
            .get(job_id)
            .ok_or_else(|| ResultError::NotFound(job_id.to_string()))?;
        Ok(handle.request_cancel())
    }

    /// Drops every job that finished or failed at least `max_age` ago.
    /// Returns how many were removed.
    pub fn sweep_finished(&self, max_age: Duration) -> usize {
        let Ok(age) = chrono::Duration::from_std(max_age) else {
            return 0;
        };
        let Some(cutoff) = Utc::now().checked_sub_signed(age) else {
            return 0;
        };
        let removed = self.registry.remove_finished_before(cutoff);
        if !removed.is_empty() {
            info!("Swept {} finished jobs", removed.len());
        }
        removed.len()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.registry.subscribe()
    }

    pub fn job_ids(&self) -> Vec<String> {
        self.registry.ids()
    }
}
