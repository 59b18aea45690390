//! Emotion analysis API handlers
//!
//! POST /emotion/text, /emotion/speech, /emotion/combined
//!
//! Only malformed requests are errors. Analysis failures come back as 200
//! with a degraded result.

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{
    error::{ApiError, ApiResult},
    fusion::FusedEmotionResult,
    types::{Language, SpeechEmotionResult, TextEmotionResult},
    AppState,
};

/// POST /emotion/text request
#[derive(Debug, Deserialize)]
pub struct TextEmotionRequest {
    pub text: String,
    /// `en` or `ur`; defaults to `en`
    #[serde(default)]
    pub language: Option<String>,
}

/// POST /emotion/speech request
#[derive(Debug, Deserialize)]
pub struct SpeechEmotionRequest {
    pub audio_path: PathBuf,
}

/// POST /emotion/combined request
#[derive(Debug, Deserialize)]
pub struct CombinedEmotionRequest {
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
    pub audio_path: PathBuf,
}

/// Resolve an optional language tag, rejecting unsupported ones
fn language_tag(language: Option<&str>) -> ApiResult<&'static str> {
    match language {
        None => Ok(Language::default().as_tag()),
        Some(tag) => Language::parse(tag)
            .map(Language::as_tag)
            .ok_or_else(|| ApiError::BadRequest(format!("Unsupported language: {}", tag))),
    }
}

fn require_audio_path(path: &Path) -> ApiResult<()> {
    if path.as_os_str().is_empty() {
        return Err(ApiError::BadRequest("audio_path is empty".to_string()));
    }
    Ok(())
}

/// POST /emotion/text
pub async fn text_emotion(
    State(state): State<AppState>,
    Json(request): Json<TextEmotionRequest>,
) -> ApiResult<Json<TextEmotionResult>> {
    let language = language_tag(request.language.as_deref())?;
    tracing::debug!(language, chars = request.text.chars().count(), "Text emotion request");

    let result = state.service.text_emotion(&request.text, language).await;
    Ok(Json(result))
}

/// POST /emotion/speech
pub async fn speech_emotion(
    State(state): State<AppState>,
    Json(request): Json<SpeechEmotionRequest>,
) -> ApiResult<Json<SpeechEmotionResult>> {
    require_audio_path(&request.audio_path)?;
    tracing::debug!(audio_path = %request.audio_path.display(), "Speech emotion request");

    let result = state.service.speech_emotion(&request.audio_path).await;
    Ok(Json(result))
}

/// POST /emotion/combined
pub async fn combined_emotion(
    State(state): State<AppState>,
    Json(request): Json<CombinedEmotionRequest>,
) -> ApiResult<Json<FusedEmotionResult>> {
    let language = language_tag(request.language.as_deref())?;
    require_audio_path(&request.audio_path)?;

    let result = state
        .service
        .combined_emotion(&request.text, language, &request.audio_path)
        .await;
    Ok(Json(result))
}

/// Build emotion analysis routes
pub fn emotion_routes() -> Router<AppState> {
    Router::new()
        .route("/emotion/text", post(text_emotion))
        .route("/emotion/speech", post(speech_emotion))
        .route("/emotion/combined", post(combined_emotion))
}
