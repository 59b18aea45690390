//! serene-emotion library interface
//!
//! Multi-modal emotion analysis over resident inference workers:
//! - [`worker`]: persistent subprocess supervision and FIFO request queue
//! - [`services`]: text and speech clients with fallbacks, [`EmotionService`] facade
//! - [`fusion`]: text + speech fusion engine
//! - [`api`]: thin HTTP surface

pub mod api;
pub mod config;
pub mod error;
pub mod fusion;
pub mod services;
pub mod types;
pub mod worker;

pub use crate::error::{ApiError, ApiResult, InferenceError, InferenceResult};
pub use crate::services::EmotionService;

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<EmotionService>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(service: Arc<EmotionService>) -> Self {
        Self {
            service,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::emotion_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
