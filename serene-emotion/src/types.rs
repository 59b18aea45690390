//! Result types shared by the emotion clients, fusion engine and HTTP layer

use serde::{Deserialize, Serialize};

/// Label used whenever no better signal is available
pub const NEUTRAL: &str = "neutral";

/// Supported keyword-fallback languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Ur,
}

impl Language {
    /// Parse a language tag (`en`, `en-US`, `ur`, `ur-PK`, case-insensitive)
    pub fn parse(tag: &str) -> Option<Self> {
        let primary = tag.trim().split(['-', '_']).next()?.to_ascii_lowercase();
        match primary.as_str() {
            "en" => Some(Language::En),
            "ur" => Some(Language::Ur),
            _ => None,
        }
    }

    /// Parse a tag, defaulting to English for unknown or missing tags
    pub fn from_tag_or_default(tag: Option<&str>) -> Self {
        tag.and_then(Self::parse).unwrap_or_default()
    }

    pub fn as_tag(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ur => "ur",
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::En
    }
}

/// Which tier produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMethod {
    /// Persistent text-emotion worker
    Worker,
    /// Local keyword scan after a worker failure
    KeywordFallback,
    /// Empty or whitespace-only text; no analysis performed
    EmptyInput,
    /// Per-call speech analyzer subprocess
    SpeechAnalyzer,
    /// Fixed neutral result after a speech analyzer failure
    DefaultNeutral,
}

/// Text-emotion result; always well-formed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEmotionResult {
    pub emotion: String,
    /// 0.0-1.0
    pub confidence: f64,
    /// Salient terms in order of discovery
    pub context: Vec<String>,
    pub method: AnalysisMethod,
    /// Why the worker tier was skipped, if it was
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TextEmotionResult {
    /// Result for empty or whitespace-only input
    pub fn empty_input() -> Self {
        Self {
            emotion: NEUTRAL.to_string(),
            confidence: 0.5,
            context: Vec::new(),
            method: AnalysisMethod::EmptyInput,
            error: None,
        }
    }
}

/// Normalized (0.0-1.0) acoustic features of one utterance
///
/// Fields missing from analyzer output take their [`Self::MODERATE`] value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechCharacteristics {
    pub energy: f64,
    pub stress_level: f64,
    pub anxiety_level: f64,
    pub pitch_variability: f64,
    pub voice_stability: f64,
    pub tempo: f64,
    pub spectral_complexity: f64,
    pub emotional_intensity: f64,
}

impl SpeechCharacteristics {
    /// Fixed moderate values used by the default neutral result
    pub const MODERATE: SpeechCharacteristics = SpeechCharacteristics {
        energy: 0.5,
        stress_level: 0.3,
        anxiety_level: 0.3,
        pitch_variability: 0.5,
        voice_stability: 0.6,
        tempo: 0.5,
        spectral_complexity: 0.5,
        emotional_intensity: 0.3,
    };

    /// Clamp every feature to 0.0-1.0 (NaN becomes 0.0)
    pub fn normalized(self) -> Self {
        fn unit(v: f64) -> f64 {
            if v.is_nan() {
                0.0
            } else {
                v.clamp(0.0, 1.0)
            }
        }

        Self {
            energy: unit(self.energy),
            stress_level: unit(self.stress_level),
            anxiety_level: unit(self.anxiety_level),
            pitch_variability: unit(self.pitch_variability),
            voice_stability: unit(self.voice_stability),
            tempo: unit(self.tempo),
            spectral_complexity: unit(self.spectral_complexity),
            emotional_intensity: unit(self.emotional_intensity),
        }
    }
}

impl Default for SpeechCharacteristics {
    fn default() -> Self {
        Self::MODERATE
    }
}

/// Speech-emotion result; always well-formed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechEmotionResult {
    pub emotion: String,
    /// 0.0-1.0
    pub confidence: f64,
    pub speech_characteristics: SpeechCharacteristics,
    pub stress_detected: bool,
    pub anxiety_detected: bool,
    pub tone: String,
    pub method: AnalysisMethod,
    /// Why the analyzer result was replaced by the default, if it was
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SpeechEmotionResult {
    /// Neutral result at confidence 0.1 used whenever analysis is unavailable
    pub fn default_neutral(error: impl Into<String>) -> Self {
        Self {
            emotion: NEUTRAL.to_string(),
            confidence: 0.1,
            speech_characteristics: SpeechCharacteristics::MODERATE,
            stress_detected: false,
            anxiety_detected: false,
            tone: NEUTRAL.to_string(),
            method: AnalysisMethod::DefaultNeutral,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parse() {
        assert_eq!(Language::parse("en"), Some(Language::En));
        assert_eq!(Language::parse("EN-us"), Some(Language::En));
        assert_eq!(Language::parse("ur_PK"), Some(Language::Ur));
        assert_eq!(Language::parse("fr"), None);
        assert_eq!(Language::parse(""), None);
        assert_eq!(Language::from_tag_or_default(Some("de")), Language::En);
        assert_eq!(Language::from_tag_or_default(None), Language::En);
    }

    #[test]
    fn test_empty_input_result() {
        let result = TextEmotionResult::empty_input();
        assert_eq!(result.emotion, "neutral");
        assert_eq!(result.confidence, 0.5);
        assert!(result.context.is_empty());
    }

    #[test]
    fn test_default_neutral_speech_result() {
        let result = SpeechEmotionResult::default_neutral("audio_file_missing");
        assert_eq!(result.emotion, "neutral");
        assert_eq!(result.confidence, 0.1);
        assert!(!result.stress_detected);
        assert!(!result.anxiety_detected);
        assert_eq!(result.method, AnalysisMethod::DefaultNeutral);
        assert_eq!(result.speech_characteristics, SpeechCharacteristics::MODERATE);
    }

    #[test]
    fn test_characteristics_normalized() {
        let raw = SpeechCharacteristics {
            energy: 1.7,
            stress_level: -0.2,
            anxiety_level: f64::NAN,
            ..SpeechCharacteristics::MODERATE
        };
        let clean = raw.normalized();
        assert_eq!(clean.energy, 1.0);
        assert_eq!(clean.stress_level, 0.0);
        assert_eq!(clean.anxiety_level, 0.0);
        assert_eq!(clean.tempo, 0.5);
    }

    #[test]
    fn test_method_serializes_snake_case() {
        let json = serde_json::to_string(&AnalysisMethod::KeywordFallback).unwrap();
        assert_eq!(json, "\"keyword_fallback\"");
    }
}
