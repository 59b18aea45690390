//! End-to-end tests of the emotion service over stand-in `sh` workers

#![cfg(unix)]

use serene_common::{EventBus, WorkerEvent};
use serene_emotion::config::{EmotionConfig, WorkerConfig};
use serene_emotion::services::WorkerFamily;
use serene_emotion::types::AnalysisMethod;
use serene_emotion::worker::{InferenceRequest, WorkerState};
use serene_emotion::EmotionService;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

/// Text worker answering "happy" for everything except requests mentioning "exam"
const TEXT_WORKER: &str = r#"echo TEXT_EMOTION_SERVER_READY >&2
while IFS= read -r line; do
  case "$line" in
    *exam*) printf '{"emotion":"fear","confidence":0.66,"context":["exam"]}\n' ;;
    *) printf '{"emotion":"happy","confidence":0.9,"context":[]}\n' ;;
  esac
done"#;

/// Analyzer reporting a sad, stressed voice
const STRESSED_ANALYZER: &str = r#"printf '{"emotion":"sad","confidence":0.6,"speech_characteristics":{"stress_level":0.8,"anxiety_level":0.2}}'"#;

fn sh_worker(name: &str, ready_marker: &str, script: &str) -> WorkerConfig {
    WorkerConfig {
        name: name.to_string(),
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        ready_marker: ready_marker.to_string(),
        timeout_ms: 5000,
        enabled: true,
    }
}

fn config(text_script: &str, analyzer_script: &str) -> EmotionConfig {
    let mut config = EmotionConfig::default();
    config.text_worker = sh_worker("text-emotion", "TEXT_EMOTION_SERVER_READY", text_script);
    config.response_worker.enabled = false;
    config.speech.program = "sh".to_string();
    config.speech.args = vec![
        "-c".to_string(),
        analyzer_script.to_string(),
        "analyzer".to_string(),
    ];
    config
}

async fn wait_until_ready(service: &EmotionService) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !service.all_workers_ready() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("workers never became ready");
}

fn audio_fixture() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"RIFF").unwrap();
    file
}

#[tokio::test]
async fn test_text_emotion_from_worker() {
    let service = EmotionService::from_config(&config(TEXT_WORKER, STRESSED_ANALYZER), EventBus::new(100));
    service.start();
    wait_until_ready(&service).await;

    let result = service.text_emotion("I am worried about my exam", "en").await;
    assert_eq!(result.emotion, "fear");
    assert_eq!(result.confidence, 0.66);
    assert_eq!(result.context, vec!["exam"]);
    assert_eq!(result.method, AnalysisMethod::Worker);

    service.shutdown();
}

#[tokio::test]
async fn test_lazy_start_on_first_use() {
    let events = EventBus::new(100);
    let mut rx = events.subscribe();
    let service = EmotionService::from_config(&config(TEXT_WORKER, STRESSED_ANALYZER), events);

    let worker = service.worker(WorkerFamily::TextEmotion).unwrap();
    assert_eq!(worker.state(), WorkerState::Created);

    // Queued until the ready marker arrives
    let result = service.text_emotion("good morning", "en").await;
    assert_eq!(result.emotion, "happy");
    assert!(matches!(rx.recv().await.unwrap(), WorkerEvent::Spawned { .. }));

    service.shutdown();
}

#[tokio::test]
async fn test_anxious_exam_with_worker_down() {
    let service = EmotionService::from_config(
        &config("echo crashed >&2; exit 1", STRESSED_ANALYZER),
        EventBus::new(100),
    );
    service.start();

    let worker = service.worker(WorkerFamily::TextEmotion).unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while worker.state() != WorkerState::Stopped {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    let result = service.text_emotion("I am very anxious about my exam", "en").await;
    assert_eq!(result.emotion, "stress");
    assert_eq!(result.confidence, 0.7);
    assert_eq!(result.method, AnalysisMethod::KeywordFallback);
    // Exited workers are not restarted behind the caller's back
    assert_eq!(worker.state(), WorkerState::Stopped);

    service.shutdown();
}

#[tokio::test]
async fn test_combined_conflict_under_stress_picks_speech() {
    let service = EmotionService::from_config(&config(TEXT_WORKER, STRESSED_ANALYZER), EventBus::new(100));
    service.start();
    wait_until_ready(&service).await;
    let audio = audio_fixture();

    let fused = service
        .combined_emotion("what a lovely day", "en", audio.path())
        .await;

    assert_eq!(fused.text_emotion, "happy");
    assert_eq!(fused.speech_emotion, "sad");
    assert!(fused.stress_detected);
    assert!(fused.trace.conflict_override);
    assert_eq!(fused.primary_emotion, "sad");
    assert_eq!(fused.tone_analysis, "tense");
    assert!(fused.confidence <= 0.95);

    service.shutdown();
}

#[tokio::test]
async fn test_raw_send_reply() {
    let service = EmotionService::from_config(&config(TEXT_WORKER, STRESSED_ANALYZER), EventBus::new(100));
    service.start();
    wait_until_ready(&service).await;

    let reply = service
        .send(WorkerFamily::TextEmotion, InferenceRequest::text("hello", "en"))
        .await;
    assert!(reply.is_ok());
    assert_eq!(reply.response.unwrap().emotion, "happy");

    service.shutdown();
    let reply = service
        .send(WorkerFamily::TextEmotion, InferenceRequest::text("hello", "en"))
        .await;
    assert_eq!(reply.error.as_deref(), Some("worker_not_running"));
}

#[tokio::test]
async fn test_worker_status_reports_each_enabled_family() {
    let mut config = config(TEXT_WORKER, STRESSED_ANALYZER);
    config.response_worker = sh_worker(
        "therapeutic-response",
        "THERAPEUTIC_SERVER_READY",
        "echo THERAPEUTIC_SERVER_READY >&2; while IFS= read -r line; do :; done",
    );
    let service = EmotionService::from_config(&config, EventBus::new(100));
    service.start();
    wait_until_ready(&service).await;

    let status = service.worker_status();
    let names: Vec<_> = status.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["text-emotion", "therapeutic-response"]);
    assert!(status.iter().all(|s| s.state == WorkerState::Ready));

    service.shutdown();
    assert!(service
        .worker_status()
        .iter()
        .all(|s| s.state == WorkerState::Stopped));
}
