//! Emotion service
//!
//! Single entry point for route handlers. Built once at bootstrap with
//! [`EmotionService::from_config`] and shared by `Arc`. Lifecycle:
//! `from_config → start → serve → shutdown`.
//!
//! None of the analysis operations fail: worker and analyzer errors become
//! degraded results whose `method`/`error` fields say what happened.

use crate::config::{EmotionConfig, WorkerConfig};
use crate::error::{InferenceError, InferenceResult};
use crate::fusion::{weighted_emotion_fusion, FusedEmotionResult};
use crate::services::{SpeechEmotionClient, TextEmotionClient};
use crate::types::{SpeechEmotionResult, TextEmotionResult};
use crate::worker::{
    InferenceBackend, InferenceRequest, InferenceResponse, WorkerState, WorkerStatus,
    WorkerSupervisor,
};
use serde::{Deserialize, Serialize};
use serene_common::EventBus;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Persistent worker families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerFamily {
    TextEmotion,
    TherapeuticResponse,
}

/// Outcome of a raw worker request
///
/// Exactly one of `response` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerReply {
    pub family: WorkerFamily,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<InferenceResponse>,
    /// Machine-readable failure code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WorkerReply {
    fn from_result(family: WorkerFamily, result: InferenceResult<InferenceResponse>) -> Self {
        match result {
            Ok(response) => Self {
                family,
                response: Some(response),
                error: None,
                message: None,
            },
            Err(err) => Self {
                family,
                response: None,
                error: Some(err.code().to_string()),
                message: Some(err.to_string()),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        self.response.is_some()
    }
}

/// Orchestration facade over the workers, clients and fusion engine
pub struct EmotionService {
    text_worker: Option<Arc<WorkerSupervisor>>,
    response_worker: Option<Arc<WorkerSupervisor>>,
    text_client: TextEmotionClient,
    speech_client: SpeechEmotionClient,
}

impl EmotionService {
    /// Build the service; no process is spawned until [`Self::start`] or
    /// first use
    pub fn from_config(config: &EmotionConfig, events: EventBus) -> Self {
        let build = |worker: &WorkerConfig| {
            worker
                .enabled
                .then(|| Arc::new(WorkerSupervisor::new(worker.clone(), events.clone())))
        };

        let text_worker = build(&config.text_worker);
        let response_worker = build(&config.response_worker);

        let text_client = match &text_worker {
            Some(worker) => TextEmotionClient::new(Arc::clone(worker) as Arc<dyn InferenceBackend>),
            None => TextEmotionClient::keyword_only(),
        };

        Self {
            text_worker,
            response_worker,
            text_client,
            speech_client: SpeechEmotionClient::new(config.speech.clone()),
        }
    }

    /// Start every enabled worker
    ///
    /// Spawn failures are logged, not returned: the service keeps answering
    /// through its fallback tiers.
    pub fn start(&self) {
        for worker in self.workers() {
            match worker.start() {
                Ok(()) => debug!(worker = worker.name(), "Worker start requested"),
                Err(e) => error!(
                    worker = worker.name(),
                    error = %e,
                    "Failed to start worker, continuing with fallbacks"
                ),
            }
        }
    }

    pub fn worker(&self, family: WorkerFamily) -> Option<&Arc<WorkerSupervisor>> {
        match family {
            WorkerFamily::TextEmotion => self.text_worker.as_ref(),
            WorkerFamily::TherapeuticResponse => self.response_worker.as_ref(),
        }
    }

    /// Text emotion with keyword fallback
    pub async fn text_emotion(&self, text: &str, language: &str) -> TextEmotionResult {
        if let Some(worker) = &self.text_worker {
            ensure_started(worker);
        }
        self.text_client.analyze(text, language).await
    }

    /// Speech emotion with default-neutral fallback
    pub async fn speech_emotion(&self, audio_path: &Path) -> SpeechEmotionResult {
        self.speech_client.analyze(audio_path).await
    }

    /// Text and speech analysis run concurrently, then fused
    pub async fn combined_emotion(
        &self,
        text: &str,
        language: &str,
        audio_path: &Path,
    ) -> FusedEmotionResult {
        let (text_result, speech_result) = tokio::join!(
            self.text_emotion(text, language),
            self.speech_emotion(audio_path)
        );

        let fused = weighted_emotion_fusion(&text_result.emotion, text_result.confidence, &speech_result);

        info!(
            text_emotion = %text_result.emotion,
            text_method = ?text_result.method,
            speech_emotion = %speech_result.emotion,
            speech_method = ?speech_result.method,
            primary_emotion = %fused.primary_emotion,
            confidence = fused.confidence,
            "Combined emotion analysis completed"
        );

        fused
    }

    /// Send a raw request to a worker family
    pub async fn send(&self, family: WorkerFamily, request: InferenceRequest) -> WorkerReply {
        let result = match self.worker(family) {
            Some(worker) => {
                ensure_started(worker);
                worker.send(request).await
            }
            None => Err(InferenceError::WorkerNotRunning),
        };

        WorkerReply::from_result(family, result)
    }

    /// Status of every enabled worker
    pub fn worker_status(&self) -> Vec<WorkerStatus> {
        self.workers().map(|w| w.status()).collect()
    }

    /// Whether every enabled worker is ready
    pub fn all_workers_ready(&self) -> bool {
        self.workers().all(|w| w.is_ready())
    }

    /// Shut down every worker; idempotent
    pub fn shutdown(&self) {
        for worker in self.workers() {
            worker.shutdown();
        }
        info!("Emotion service shut down");
    }

    fn workers(&self) -> impl Iterator<Item = &Arc<WorkerSupervisor>> {
        self.text_worker.iter().chain(self.response_worker.iter())
    }
}

/// Lazy start on first use; a worker that has exited stays down
fn ensure_started(worker: &WorkerSupervisor) {
    if worker.state() != WorkerState::Created {
        return;
    }
    if let Err(e) = worker.start() {
        error!(worker = worker.name(), error = %e, "Lazy worker start failed");
    }
}
