//! Emotion analysis services
//!
//! - [`TextEmotionClient`]: persistent worker, keyword fallback
//! - [`SpeechEmotionClient`]: per-call analyzer subprocess, neutral fallback
//! - [`EmotionService`]: facade owning both plus the worker supervisors

pub mod emotion_service;
pub mod keyword_classifier;
pub mod speech_emotion_client;
pub mod text_emotion_client;

pub use emotion_service::{EmotionService, WorkerFamily, WorkerReply};
pub use keyword_classifier::{KeywordClassifier, KeywordMatch};
pub use speech_emotion_client::SpeechEmotionClient;
pub use text_emotion_client::TextEmotionClient;
