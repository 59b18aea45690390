//! Text-emotion client
//!
//! Sends `text_with_context` requests to the persistent text-emotion worker
//! and falls back to the [`KeywordClassifier`] on any failure. Never returns
//! an error: the result's `method` records which tier answered.

use crate::error::InferenceError;
use crate::services::keyword_classifier::KeywordClassifier;
use crate::types::{AnalysisMethod, Language, TextEmotionResult};
use crate::worker::{InferenceBackend, InferenceRequest};
use std::sync::Arc;
use tracing::{debug, warn};

/// Text-emotion client with keyword fallback
#[derive(Clone)]
pub struct TextEmotionClient {
    backend: Option<Arc<dyn InferenceBackend>>,
    keywords: KeywordClassifier,
}

impl TextEmotionClient {
    /// Client backed by a persistent worker
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self {
            backend: Some(backend),
            keywords: KeywordClassifier::new(),
        }
    }

    /// Client with no worker configured; every call uses the keyword tier
    pub fn keyword_only() -> Self {
        Self {
            backend: None,
            keywords: KeywordClassifier::new(),
        }
    }

    /// Analyze `text` for emotion
    ///
    /// Empty or whitespace-only text returns neutral at 0.5 without contacting
    /// the worker. `language` selects the keyword lists used by the fallback
    /// and is forwarded to the worker as given.
    pub async fn analyze(&self, text: &str, language: &str) -> TextEmotionResult {
        if text.trim().is_empty() {
            return TextEmotionResult::empty_input();
        }

        let error = match &self.backend {
            Some(backend) => {
                let request = InferenceRequest::text_with_context(text, language);
                match backend.infer(request).await {
                    Ok(response) => {
                        debug!(
                            worker = backend.name(),
                            emotion = %response.emotion,
                            confidence = response.confidence,
                            "Text emotion from worker"
                        );
                        return TextEmotionResult {
                            emotion: response.emotion,
                            confidence: response.confidence.clamp(0.0, 1.0),
                            context: response.context,
                            method: AnalysisMethod::Worker,
                            error: None,
                        };
                    }
                    Err(err) => {
                        warn!(
                            worker = backend.name(),
                            error = %err,
                            "Text emotion worker failed, using keyword fallback"
                        );
                        err
                    }
                }
            }
            None => InferenceError::WorkerNotRunning,
        };

        self.keyword_fallback(text, language, error)
    }

    fn keyword_fallback(&self, text: &str, language: &str, error: InferenceError) -> TextEmotionResult {
        let language = Language::from_tag_or_default(Some(language));
        let matched = self.keywords.classify(text, language);

        debug!(
            language = language.as_tag(),
            emotion = %matched.emotion,
            matched = matched.matched,
            "Keyword fallback classification"
        );

        TextEmotionResult {
            emotion: matched.emotion,
            confidence: matched.confidence,
            context: matched.context,
            method: AnalysisMethod::KeywordFallback,
            error: Some(error.code().to_string()),
        }
    }
}
