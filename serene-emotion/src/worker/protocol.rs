//! Line-delimited JSON wire format for persistent workers
//!
//! One request object per line on the worker's stdin, one response object per
//! line on its stdout. Every request carries a `requestId`; workers may echo it
//! back but are not required to.

use crate::error::{InferenceError, InferenceResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Request mode understood by the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceMode {
    Text,
    TextWithContext,
    Voice,
    Combined,
}

/// One request to a persistent worker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceRequest {
    pub mode: InferenceMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<PathBuf>,
    /// Mode-specific fields passed through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InferenceRequest {
    fn new(mode: InferenceMode) -> Self {
        Self {
            mode,
            text: None,
            language: None,
            audio_path: None,
            extra: Map::new(),
        }
    }

    pub fn text(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            language: Some(language.into()),
            ..Self::new(InferenceMode::Text)
        }
    }

    pub fn text_with_context(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            language: Some(language.into()),
            ..Self::new(InferenceMode::TextWithContext)
        }
    }

    pub fn voice(audio_path: impl Into<PathBuf>) -> Self {
        Self {
            audio_path: Some(audio_path.into()),
            ..Self::new(InferenceMode::Voice)
        }
    }

    pub fn combined(
        text: impl Into<String>,
        language: impl Into<String>,
        audio_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            text: Some(text.into()),
            language: Some(language.into()),
            audio_path: Some(audio_path.into()),
            ..Self::new(InferenceMode::Combined)
        }
    }

    /// Attach a mode-specific field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Encode as a single JSON line (without the trailing newline)
    pub fn encode_line(&self, request_id: &str) -> InferenceResult<String> {
        #[derive(Serialize)]
        struct Wire<'a> {
            #[serde(flatten)]
            request: &'a InferenceRequest,
            #[serde(rename = "requestId")]
            request_id: &'a str,
        }

        serde_json::to_string(&Wire {
            request: self,
            request_id,
        })
        .map_err(|e| InferenceError::Serialization(e.to_string()))
    }
}

/// Successful worker response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceResponse {
    pub emotion: String,
    /// Clamped to 0.0-1.0
    pub confidence: f64,
    /// Salient terms, most relevant first
    pub context: Vec<String>,
    /// Mode-specific fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A parsed response line
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLine {
    /// `requestId` echoed by the worker, if any
    pub request_id: Option<String>,
    pub result: InferenceResult<InferenceResponse>,
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(rename = "requestId", default)]
    request_id: Option<String>,
    #[serde(default)]
    emotion: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    context: Option<Vec<String>>,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Decode one stdout line
///
/// Returns `Err` only when the line is not a JSON object at all; a well-formed
/// object that is missing required fields or carries `error` decodes to an
/// `Err` inside [`DecodedLine::result`] so its echoed id is still available.
pub fn decode_line(line: &str) -> InferenceResult<DecodedLine> {
    let wire: WireResponse = serde_json::from_str(line.trim())
        .map_err(|e| InferenceError::InvalidWorkerResponse(e.to_string()))?;

    let result = if let Some(error) = wire.error {
        Err(InferenceError::WorkerReported(error))
    } else {
        match (wire.emotion, wire.confidence) {
            (Some(emotion), Some(confidence)) if confidence.is_finite() => Ok(InferenceResponse {
                emotion,
                confidence: confidence.clamp(0.0, 1.0),
                context: wire.context.unwrap_or_default(),
                extra: wire.extra,
            }),
            (None, _) => Err(InferenceError::InvalidWorkerResponse(
                "missing emotion".to_string(),
            )),
            (Some(_), _) => Err(InferenceError::InvalidWorkerResponse(
                "missing or non-finite confidence".to_string(),
            )),
        }
    };

    Ok(DecodedLine {
        request_id: wire.request_id,
        result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_with_context_wire_shape() {
        let line = InferenceRequest::text_with_context("I feel fine", "en")
            .encode_line("1700000000000-0000abcd")
            .unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["mode"], "text_with_context");
        assert_eq!(value["text"], "I feel fine");
        assert_eq!(value["language"], "en");
        assert_eq!(value["requestId"], "1700000000000-0000abcd");
        assert!(value.get("audio_path").is_none());
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_voice_and_extra_fields() {
        let line = InferenceRequest::voice("/tmp/a.wav")
            .with_field("sample_rate", 16000)
            .encode_line("id")
            .unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["mode"], "voice");
        assert_eq!(value["audio_path"], "/tmp/a.wav");
        assert_eq!(value["sample_rate"], 16000);
        assert!(value.get("text").is_none());
    }

    #[test]
    fn test_decode_success_clamps_confidence() {
        let decoded = decode_line(
            r#"{"emotion":"joy","confidence":1.4,"context":["exam","pass"],"model":"xlm"}"#,
        )
        .unwrap();

        assert_eq!(decoded.request_id, None);
        let response = decoded.result.unwrap();
        assert_eq!(response.emotion, "joy");
        assert_eq!(response.confidence, 1.0);
        assert_eq!(response.context, vec!["exam", "pass"]);
        assert_eq!(response.extra["model"], "xlm");
    }

    #[test]
    fn test_decode_error_object_keeps_echoed_id() {
        let decoded = decode_line(r#"{"error":"model crashed","requestId":"r1"}"#).unwrap();
        assert_eq!(decoded.request_id.as_deref(), Some("r1"));
        assert_eq!(
            decoded.result,
            Err(InferenceError::WorkerReported("model crashed".to_string()))
        );
    }

    #[test]
    fn test_decode_missing_fields_is_invalid() {
        let decoded = decode_line(r#"{"confidence":0.4}"#).unwrap();
        assert!(matches!(
            decoded.result,
            Err(InferenceError::InvalidWorkerResponse(_))
        ));

        let decoded = decode_line(r#"{"emotion":"joy"}"#).unwrap();
        assert!(matches!(
            decoded.result,
            Err(InferenceError::InvalidWorkerResponse(_))
        ));
    }

    #[test]
    fn test_decode_non_json_is_err() {
        assert!(matches!(
            decode_line("Loading weights... 40%"),
            Err(InferenceError::InvalidWorkerResponse(_))
        ));
        assert!(decode_line("[1,2,3]").is_err());
    }
}
