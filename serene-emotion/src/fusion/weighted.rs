// Weighted Fuser - confidence-weighted vote with stress/anxiety bias
//
// 1. text weight = text confidence * 0.6, speech weight = speech confidence * 0.4
// 2. stress or anxiety detected: speech += 0.3, text -= 0.2 (text may go negative)
// 3. normalize to sum 1 (zero total: 0.5 / 0.5)
// 4. larger weight picks the label (tie: text); confidence blends both
// 5. conflicting labels: speech wins under stress/anxiety, otherwise text
// 6. confidence clamped to [0, 0.95]

use crate::fusion::{
    is_conflicting_pair, FusedEmotionResult, FusionTrace, FUSION_METHOD, MAX_FUSED_CONFIDENCE,
    SPEECH_BASE_WEIGHT, STRESS_SPEECH_BOOST, STRESS_TEXT_PENALTY, TEXT_BASE_WEIGHT,
};
use crate::types::SpeechEmotionResult;
use tracing::debug;

/// Fuse a text emotion with a speech result
///
/// Deterministic for fixed inputs. Never skipped: a default-neutral speech
/// result (confidence 0.1) simply lets the text label dominate.
pub fn weighted_emotion_fusion(
    text_emotion: &str,
    text_confidence: f64,
    speech: &SpeechEmotionResult,
) -> FusedEmotionResult {
    let text_confidence = unit(text_confidence);
    let speech_confidence = unit(speech.confidence);
    let stressed = speech.stress_detected || speech.anxiety_detected;

    let mut text_weight = text_confidence * TEXT_BASE_WEIGHT;
    let mut speech_weight = speech_confidence * SPEECH_BASE_WEIGHT;
    if stressed {
        speech_weight += STRESS_SPEECH_BOOST;
        text_weight -= STRESS_TEXT_PENALTY;
    }

    let total = text_weight + speech_weight;
    let (text_weight, speech_weight) = if total > 0.0 {
        (text_weight / total, speech_weight / total)
    } else {
        (0.5, 0.5)
    };

    let speech_leads = speech_weight > text_weight;
    let (mut primary, blended) = if speech_leads {
        (
            speech.emotion.as_str(),
            speech_confidence * speech_weight + text_confidence * text_weight,
        )
    } else {
        (
            text_emotion,
            text_confidence * text_weight + speech_confidence * speech_weight,
        )
    };

    let conflict_override = is_conflicting_pair(text_emotion, &speech.emotion);
    if conflict_override {
        primary = if stressed {
            speech.emotion.as_str()
        } else {
            text_emotion
        };
    }

    let confidence = if blended.is_nan() {
        0.0
    } else {
        blended.clamp(0.0, MAX_FUSED_CONFIDENCE)
    };

    debug!(
        text_emotion = %text_emotion,
        speech_emotion = %speech.emotion,
        text_weight,
        speech_weight,
        conflict_override,
        primary = %primary,
        confidence,
        "Fused text and speech emotion"
    );

    FusedEmotionResult {
        primary_emotion: primary.to_string(),
        confidence,
        text_emotion: text_emotion.to_string(),
        text_confidence,
        speech_emotion: speech.emotion.clone(),
        speech_confidence,
        speech_characteristics: speech.speech_characteristics,
        stress_detected: speech.stress_detected,
        anxiety_detected: speech.anxiety_detected,
        tone_analysis: speech.tone.clone(),
        method: FUSION_METHOD.to_string(),
        trace: FusionTrace {
            text_weight,
            speech_weight,
            conflict_override,
        },
    }
}

fn unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnalysisMethod, SpeechCharacteristics};

    fn speech(emotion: &str, confidence: f64, stress: bool, anxiety: bool) -> SpeechEmotionResult {
        SpeechEmotionResult {
            emotion: emotion.to_string(),
            confidence,
            speech_characteristics: SpeechCharacteristics::MODERATE,
            stress_detected: stress,
            anxiety_detected: anxiety,
            tone: "calm".to_string(),
            method: AnalysisMethod::SpeechAnalyzer,
            error: None,
        }
    }

    #[test]
    fn test_text_dominates_confident_joy() {
        let fused = weighted_emotion_fusion("joy", 0.9, &speech("neutral", 0.2, false, false));

        assert_eq!(fused.primary_emotion, "joy");
        assert!(fused.trace.text_weight > fused.trace.speech_weight);
        assert!(!fused.trace.conflict_override);
        // 0.9 * (0.54 / 0.62) + 0.2 * (0.08 / 0.62)
        assert!((fused.confidence - 0.80968).abs() < 1e-4);
        assert_eq!(fused.method, "iemocap_text_speech_fusion");
    }

    #[test]
    fn test_conflict_under_stress_picks_speech() {
        // Weights alone favour text (0.4 vs 0.3); the conflict rule overrides
        let fused = weighted_emotion_fusion("happy", 1.0, &speech("sad", 0.0, true, false));

        assert!(fused.trace.text_weight > fused.trace.speech_weight);
        assert!(fused.trace.conflict_override);
        assert_eq!(fused.primary_emotion, "sad");
    }

    #[test]
    fn test_conflict_without_stress_picks_text() {
        // Speech leads on weight but the labels conflict
        let fused = weighted_emotion_fusion("calm", 0.1, &speech("angry", 0.9, false, false));

        assert!(fused.trace.speech_weight > fused.trace.text_weight);
        assert_eq!(fused.primary_emotion, "calm");
    }

    #[test]
    fn test_stress_boost_can_make_text_weight_negative() {
        let fused = weighted_emotion_fusion("neutral", 0.1, &speech("fear", 0.5, false, true));

        // text: 0.06 - 0.2 = -0.14, speech: 0.2 + 0.3 = 0.5
        assert!(fused.trace.text_weight < 0.0);
        assert!(fused.trace.speech_weight > 1.0);
        assert_eq!(fused.primary_emotion, "fear");
        assert!((0.0..=0.95).contains(&fused.confidence));
    }

    #[test]
    fn test_confidence_ceiling() {
        for (stress, anxiety) in [(false, false), (true, false), (false, true), (true, true)] {
            let fused = weighted_emotion_fusion("joy", 1.0, &speech("joy", 1.0, stress, anxiety));
            assert!(fused.confidence <= 0.95);
        }
        let fused = weighted_emotion_fusion("joy", f64::INFINITY, &speech("joy", 7.0, false, false));
        assert_eq!(fused.confidence, 0.95);
    }

    #[test]
    fn test_zero_confidences_split_evenly() {
        let fused = weighted_emotion_fusion("joy", 0.0, &speech("sad", 0.0, false, false));
        assert_eq!(fused.trace.text_weight, 0.5);
        assert_eq!(fused.trace.speech_weight, 0.5);
        // Tie goes to text
        assert_eq!(fused.primary_emotion, "joy");
        assert_eq!(fused.confidence, 0.0);

        let fused = weighted_emotion_fusion("joy", f64::NAN, &speech("sad", f64::NAN, false, false));
        assert_eq!(fused.confidence, 0.0);
    }

    #[test]
    fn test_default_neutral_speech_defers_to_text() {
        let fused = weighted_emotion_fusion(
            "stress",
            0.7,
            &SpeechEmotionResult::default_neutral("audio_file_missing"),
        );
        assert_eq!(fused.primary_emotion, "stress");
        assert!(!fused.stress_detected);
        assert_eq!(fused.tone_analysis, "neutral");
    }

    #[test]
    fn test_fusion_is_deterministic() {
        let input = speech("sad", 0.55, true, true);
        let first = serde_json::to_vec(&weighted_emotion_fusion("happy", 0.8, &input)).unwrap();
        for _ in 0..10 {
            let again = serde_json::to_vec(&weighted_emotion_fusion("happy", 0.8, &input)).unwrap();
            assert_eq!(first, again);
        }
    }
}
