//! Test harness for running jobs against fake collaborators.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use vidspell::analysis::WordListDictionary;
use vidspell::{AnalysisConfig, JobView, Orchestrator};

use super::fakes::{FakeExtractor, FakeSpeech, ScriptedVision};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const POLL_LIMIT: Duration = Duration::from_secs(20);

/// Words the English cross-check treats as correctly spelled.
pub const DICTIONARY: &[&str] = &[
    "hello", "world", "welcome", "to", "the", "channel", "subscribe", "for", "more", "sale",
    "today", "only", "receive", "your", "free", "gift",
];

pub struct TestHarness {
    pub orchestrator: Orchestrator,
    pub vision: Arc<ScriptedVision>,
    pub speech: Arc<FakeSpeech>,
}

impl TestHarness {
    pub fn new(extractor: FakeExtractor, vision: ScriptedVision, speech: FakeSpeech) -> Self {
        Self::with_config(test_config(), extractor, vision, speech)
    }

    pub fn with_config(
        config: AnalysisConfig,
        extractor: FakeExtractor,
        vision: ScriptedVision,
        speech: FakeSpeech,
    ) -> Self {
        let vision = Arc::new(vision);
        let speech = Arc::new(speech);
        let orchestrator = Orchestrator::new(
            config,
            Arc::new(extractor),
            Arc::clone(&vision) as Arc<dyn vidspell::VisionModel>,
            Arc::clone(&speech) as Arc<dyn vidspell::SpeechToText>,
            Arc::new(WordListDictionary::from_words(DICTIONARY)),
        );
        Self {
            orchestrator,
            vision,
            speech,
        }
    }

    /// Polls until the job reaches done or error.
    pub async fn wait(&self, job_id: &str) -> JobView {
        let started = std::time::Instant::now();
        loop {
            let view = self
                .orchestrator
                .snapshot(job_id)
                .expect("job should be registered");
            if view.status.is_terminal() {
                return view;
            }
            assert!(
                started.elapsed() < POLL_LIMIT,
                "job {} still {} in phase {}",
                job_id,
                view.status,
                view.phase
            );
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

/// Defaults with timeouts short enough for tests.
pub fn test_config() -> AnalysisConfig {
    let mut config = AnalysisConfig::default();
    config.timeouts.health_check_secs = 1;
    config.timeouts.extraction_secs = 2;
    config.timeouts.transcription_secs = 1;
    config.timeouts.inference_secs = 2;
    config
}
