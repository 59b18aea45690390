//! HTTP API handlers for serene-emotion

pub mod emotion;
pub mod health;

pub use emotion::emotion_routes;
pub use health::health_routes;
