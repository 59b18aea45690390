//! Configuration for serene-emotion
//!
//! Loaded once at bootstrap from `serene-emotion.toml` (see
//! [`serene_common::config::resolve_config_path`] for the lookup order).
//! Top-level keys and whole sections are optional; an empty file yields the
//! built-in defaults. A `[text_worker]` or `[response_worker]` section that is
//! present replaces that worker's defaults, so it must give `name`, `program`,
//! `ready_marker` and `timeout_ms`.

use serde::{Deserialize, Serialize};
use serene_common::config::LoggingConfig;
use serene_common::{Error, Result};
use std::path::Path;
use std::time::Duration;

/// Config file name under the platform config directory
pub const CONFIG_FILE_NAME: &str = "serene-emotion.toml";

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SERENE_CONFIG";

/// Default timeout for text/voice workers
pub const DEFAULT_TEXT_TIMEOUT_MS: u64 = 15_000;

/// Default timeout for heavy generative workers
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 90_000;

/// Top-level service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionConfig {
    /// HTTP listen address
    pub bind_address: String,
    pub logging: LoggingConfig,
    /// Persistent text-emotion worker
    pub text_worker: WorkerConfig,
    /// Persistent therapeutic-response worker (disabled by default)
    pub response_worker: WorkerConfig,
    /// Per-call speech-emotion analyzer
    pub speech: SpeechConfig,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5750".to_string(),
            logging: LoggingConfig::default(),
            text_worker: WorkerConfig::text_emotion(),
            response_worker: WorkerConfig::therapeutic_response(),
            speech: SpeechConfig::default(),
        }
    }
}

impl EmotionConfig {
    /// Load and validate config from an optional file path
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: Self = serene_common::config::load_toml_config(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the service unusable
    pub fn validate(&self) -> Result<()> {
        for (section, worker) in [
            ("text_worker", &self.text_worker),
            ("response_worker", &self.response_worker),
        ] {
            if !worker.enabled {
                continue;
            }
            if worker.program.trim().is_empty() {
                return Err(Error::Config(format!("[{}] program is empty", section)));
            }
            if worker.timeout_ms == 0 {
                return Err(Error::Config(format!("[{}] timeout_ms must be > 0", section)));
            }
            if worker.ready_marker.is_empty() {
                return Err(Error::Config(format!("[{}] ready_marker is empty", section)));
            }
        }

        for (name, value) in [
            ("stress_threshold", self.speech.stress_threshold),
            ("anxiety_threshold", self.speech.anxiety_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "[speech] {} must be within 0.0-1.0, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

/// Persistent worker launch settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Worker name used in logs and events
    pub name: String,
    /// Interpreter or executable
    pub program: String,
    /// Arguments (typically the server script)
    #[serde(default)]
    pub args: Vec<String>,
    /// Literal substring on stderr that marks model loading complete
    pub ready_marker: String,
    /// Per-request timeout horizon
    pub timeout_ms: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl WorkerConfig {
    /// Defaults for the text-emotion worker
    pub fn text_emotion() -> Self {
        Self {
            name: "text-emotion".to_string(),
            program: "python3".to_string(),
            args: vec!["workers/text_emotion_server.py".to_string()],
            ready_marker: "TEXT_EMOTION_SERVER_READY".to_string(),
            timeout_ms: DEFAULT_TEXT_TIMEOUT_MS,
            enabled: true,
        }
    }

    /// Defaults for the therapeutic-response worker
    pub fn therapeutic_response() -> Self {
        Self {
            name: "therapeutic-response".to_string(),
            program: "python3".to_string(),
            args: vec!["workers/therapeutic_server.py".to_string()],
            ready_marker: "THERAPEUTIC_SERVER_READY".to_string(),
            timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            enabled: false,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Speech analyzer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Interpreter or executable
    pub program: String,
    /// Arguments placed before the audio path
    pub args: Vec<String>,
    /// `stress_detected` when stress_level exceeds this value
    pub stress_threshold: f64,
    /// `anxiety_detected` when anxiety_level exceeds this value
    pub anxiety_threshold: f64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["workers/speech_emotion.py".to_string()],
            stress_threshold: 0.6,
            anxiety_threshold: 0.6,
        }
    }
}
