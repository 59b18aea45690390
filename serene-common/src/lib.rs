//! # Serene Common Library
//!
//! Shared code for the Serene services including:
//! - Error types
//! - TOML configuration resolution and loading
//! - Worker lifecycle events (`WorkerEvent`) and the broadcast `EventBus`
//! - Request correlation identifiers

pub mod config;
pub mod error;
pub mod events;
pub mod request_id;

pub use error::{Error, Result};
pub use events::{EventBus, WorkerEvent};
