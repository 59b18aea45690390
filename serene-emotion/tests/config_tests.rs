//! serene-emotion.toml loading tests
//!
//! Tests that manipulate SERENE_CONFIG are marked with #[serial].

use serene_common::config::resolve_config_path;
use serene_emotion::config::{EmotionConfig, CONFIG_ENV_VAR, CONFIG_FILE_NAME};
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

const FULL_CONFIG: &str = r#"
bind_address = "0.0.0.0:5750"

[logging]
level = "serene_emotion=debug,tower_http=info"

[text_worker]
name = "text-emotion"
program = "/opt/serene/venv/bin/python"
args = ["workers/text_emotion_server.py", "--model", "distilroberta"]
ready_marker = "TEXT_EMOTION_SERVER_READY"
timeout_ms = 10000

[response_worker]
name = "therapeutic-response"
program = "/opt/serene/venv/bin/python"
args = ["workers/therapeutic_server.py"]
ready_marker = "THERAPEUTIC_SERVER_READY"
timeout_ms = 120000
enabled = true

[speech]
program = "/opt/serene/venv/bin/python"
args = ["workers/speech_emotion.py"]
stress_threshold = 0.65
anxiety_threshold = 0.55
"#;

#[test]
#[serial]
fn test_config_loaded_from_env_var_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, FULL_CONFIG).unwrap();
    env::set_var(CONFIG_ENV_VAR, &path);

    let resolved = resolve_config_path(None, CONFIG_ENV_VAR, CONFIG_FILE_NAME);
    let config = EmotionConfig::load(resolved.as_deref()).unwrap();

    assert_eq!(config.bind_address, "0.0.0.0:5750");
    assert_eq!(config.logging.level, "serene_emotion=debug,tower_http=info");
    assert_eq!(config.text_worker.args.len(), 3);
    assert_eq!(config.text_worker.timeout_ms, 10_000);
    assert!(config.response_worker.enabled);
    assert_eq!(config.response_worker.timeout_ms, 120_000);
    assert_eq!(config.speech.stress_threshold, 0.65);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    let config = EmotionConfig::load(Some(&path)).unwrap();
    assert_eq!(config, EmotionConfig::default());
}

#[test]
fn test_invalid_values_rejected_at_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(
        &path,
        r#"
        [text_worker]
        name = "text-emotion"
        program = "python3"
        ready_marker = "READY"
        timeout_ms = 0
        "#,
    )
    .unwrap();

    let err = EmotionConfig::load(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("timeout_ms"));
}

#[test]
fn test_worker_section_requires_name() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(
        &path,
        r#"
        [text_worker]
        program = "python3"
        ready_marker = "READY"
        timeout_ms = 1000
        "#,
    )
    .unwrap();

    assert!(EmotionConfig::load(Some(&path)).is_err());
}
