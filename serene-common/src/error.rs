//! Common error types for Serene

use thiserror::Error;

/// Common result type for Serene operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Serene services
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
