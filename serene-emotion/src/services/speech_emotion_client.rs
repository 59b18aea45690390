//! Speech-emotion client
//!
//! Runs the speech analyzer once per call as `<program> <args...> <audio_path>`
//! and parses the single JSON document it writes to stdout. Unlike the
//! persistent text worker there is no queue and no timeout of its own: the
//! subprocess is spawned with `kill_on_drop`, so a caller that stops waiting
//! (for example by wrapping the call in `tokio::time::timeout`) also stops
//! the analyzer.
//!
//! [`SpeechEmotionClient::analyze`] never fails; every error resolves to
//! [`SpeechEmotionResult::default_neutral`].

use crate::config::SpeechConfig;
use crate::error::{InferenceError, InferenceResult};
use crate::types::{AnalysisMethod, SpeechCharacteristics, SpeechEmotionResult};
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Document written by the analyzer on success
#[derive(Debug, Deserialize)]
struct AnalyzerOutput {
    emotion: String,
    confidence: f64,
    #[serde(default)]
    speech_characteristics: SpeechCharacteristics,
    #[serde(default)]
    tone: Option<String>,
}

/// Per-call speech analyzer client
#[derive(Debug, Clone)]
pub struct SpeechEmotionClient {
    config: SpeechConfig,
}

impl SpeechEmotionClient {
    pub fn new(config: SpeechConfig) -> Self {
        Self { config }
    }

    /// Analyze an audio file, degrading to the neutral default on any failure
    pub async fn analyze(&self, audio_path: &Path) -> SpeechEmotionResult {
        match self.analyze_checked(audio_path).await {
            Ok(result) => result,
            Err(err) => {
                warn!(
                    audio_file = %audio_path.display(),
                    error = %err,
                    "Speech analysis failed, using default neutral result"
                );
                SpeechEmotionResult::default_neutral(err.code())
            }
        }
    }

    /// Analyze an audio file, surfacing the failure cause
    pub async fn analyze_checked(&self, audio_path: &Path) -> InferenceResult<SpeechEmotionResult> {
        if tokio::fs::metadata(audio_path).await.is_err() {
            return Err(InferenceError::AudioFileMissing(audio_path.to_path_buf()));
        }

        debug!(
            audio_file = %audio_path.display(),
            program = %self.config.program,
            "Running speech analyzer"
        );
        let started = Instant::now();

        let output = Command::new(&self.config.program)
            .args(&self.config.args)
            .arg(audio_path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| InferenceError::SpawnError(format!("{}: {}", self.config.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InferenceError::InvalidWorkerResponse(format!(
                "Exit code: {:?}, stderr: {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let result = self.parse_output(&stdout)?;

        info!(
            audio_file = %audio_path.display(),
            emotion = %result.emotion,
            confidence = result.confidence,
            stress_detected = result.stress_detected,
            anxiety_detected = result.anxiety_detected,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Speech analysis completed"
        );

        Ok(result)
    }

    /// Parse analyzer stdout into a normalized result
    ///
    /// Accepts the whole output as one document, or its last non-empty line
    /// when the analyzer printed diagnostics first.
    pub fn parse_output(&self, stdout: &str) -> InferenceResult<SpeechEmotionResult> {
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Err(InferenceError::InvalidWorkerResponse(
                "analyzer produced no output".to_string(),
            ));
        }

        let parsed: AnalyzerOutput = match serde_json::from_str(trimmed) {
            Ok(parsed) => parsed,
            Err(first_err) => trimmed
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .and_then(|l| serde_json::from_str(l.trim()).ok())
                .ok_or_else(|| InferenceError::InvalidWorkerResponse(first_err.to_string()))?,
        };

        if parsed.emotion.trim().is_empty() {
            return Err(InferenceError::InvalidWorkerResponse(
                "analyzer returned an empty emotion label".to_string(),
            ));
        }

        let characteristics = parsed.speech_characteristics.normalized();
        let stress_detected = characteristics.stress_level > self.config.stress_threshold;
        let anxiety_detected = characteristics.anxiety_level > self.config.anxiety_threshold;
        let tone = parsed
            .tone
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| {
                derive_tone(&characteristics, stress_detected, anxiety_detected).to_string()
            });

        Ok(SpeechEmotionResult {
            emotion: parsed.emotion,
            confidence: if parsed.confidence.is_nan() {
                0.0
            } else {
                parsed.confidence.clamp(0.0, 1.0)
            },
            speech_characteristics: characteristics,
            stress_detected,
            anxiety_detected,
            tone,
            method: AnalysisMethod::SpeechAnalyzer,
            error: None,
        })
    }
}

/// Tone label for analyzer output that did not name one
pub fn derive_tone(
    characteristics: &SpeechCharacteristics,
    stress_detected: bool,
    anxiety_detected: bool,
) -> &'static str {
    if stress_detected || anxiety_detected {
        "tense"
    } else if characteristics.energy > 0.7 && characteristics.emotional_intensity > 0.6 {
        "energetic"
    } else if characteristics.energy < 0.3 {
        "subdued"
    } else if characteristics.voice_stability < 0.4 {
        "unsteady"
    } else {
        "calm"
    }
}
