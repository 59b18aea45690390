// Fusion Module - Text + Speech Emotion Fusion
//
// Combines one text-emotion result with one speech-emotion result into a
// single primary emotion. Pure: no I/O, no clock, no randomness.

pub mod conflict;
pub mod weighted;

pub use conflict::{is_conflicting_pair, CONFLICTING_PAIRS};
pub use weighted::weighted_emotion_fusion;

use crate::types::SpeechCharacteristics;
use serde::{Deserialize, Serialize};

/// Provenance tag carried by every fused result
pub const FUSION_METHOD: &str = "iemocap_text_speech_fusion";

/// Ceiling applied to every fused confidence
pub const MAX_FUSED_CONFIDENCE: f64 = 0.95;

/// Base share of the text confidence
pub const TEXT_BASE_WEIGHT: f64 = 0.6;

/// Base share of the speech confidence
pub const SPEECH_BASE_WEIGHT: f64 = 0.4;

/// Added to the speech weight when stress or anxiety is detected
pub const STRESS_SPEECH_BOOST: f64 = 0.3;

/// Removed from the text weight when stress or anxiety is detected
pub const STRESS_TEXT_PENALTY: f64 = 0.2;

/// Intermediate values of one fusion, kept for auditing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionTrace {
    /// Normalized text weight (may be negative under a stress boost)
    pub text_weight: f64,
    /// Normalized speech weight
    pub speech_weight: f64,
    /// Labels formed a conflicting pair and the override rule chose the primary
    pub conflict_override: bool,
}

/// Fused text + speech emotion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedEmotionResult {
    pub primary_emotion: String,
    /// 0.0-0.95
    pub confidence: f64,
    pub text_emotion: String,
    pub text_confidence: f64,
    pub speech_emotion: String,
    pub speech_confidence: f64,
    pub speech_characteristics: SpeechCharacteristics,
    pub stress_detected: bool,
    pub anxiety_detected: bool,
    pub tone_analysis: String,
    pub method: String,
    pub trace: FusionTrace,
}
