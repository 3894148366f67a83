//! Integration tests for the deadline-bounded orchestrator.
//!
//! Timing assertions use real time with wide margins so they hold on loaded
//! CI machines.

mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use common::{init_test_logger, RecordingUploader, SlowProfiler};
use debug_collector::collectors::{collect_and_upload, DebugCollector};
use debug_collector::config::{DebugConfig, StorageConfig};
use debug_collector::models::{ArtifactKind, RunState, SessionId};
use debug_collector::sources::{ElementState, PipelineGraph};

fn sid() -> SessionId {
    SessionId::new("EG_test").unwrap()
}

fn config(deadline_ms: u64, upload_dir: &Path) -> DebugConfig {
    let mut config = DebugConfig::new(StorageConfig::Local { directory: upload_dir.to_path_buf() });
    config.deadline_ms = deadline_ms;
    config
}

fn collector(tmp_dir: &Path, deadline_ms: u64, profile_delay: Duration) -> DebugCollector {
    let mut graph = PipelineGraph::new("egress");
    graph
        .add_element("src", "appsrc", ElementState::Playing)
        .add_element("sink", "filesink", ElementState::Playing)
        .link("src", "src", "sink", "sink", None);

    DebugCollector::new(sid(), tmp_dir, config(deadline_ms, &tmp_dir.join("uploads")), Arc::new(graph))
        .with_profiler(Arc::new(SlowProfiler(profile_delay)))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_only_matching_track_files_are_uploaded() {
    init_test_logger();
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a.csv"), "track,a\n").unwrap();
    fs::write(temp_dir.path().join("b.csv"), "track,b\n").unwrap();
    fs::write(temp_dir.path().join("c.txt"), "ignored").unwrap();

    let uploader = RecordingUploader::new();
    let summary = collector(temp_dir.path(), 10_000, Duration::ZERO)
        .upload_with(uploader.clone())
        .await;

    assert_eq!(summary.state, RunState::AllCompleted);
    assert!(summary.all_succeeded());
    assert_eq!(
        uploader.keys(),
        vec!["EG_test/EG_test.dot", "EG_test/EG_test.prof", "EG_test/a.csv", "EG_test/b.csv"]
    );

    let dot = fs::read_to_string(temp_dir.path().join("EG_test.dot")).unwrap();
    assert!(dot.contains("digraph"));
    assert!(temp_dir.path().join("EG_test.prof").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_slow_profile_returns_at_deadline() {
    init_test_logger();
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a.csv"), "track,a\n").unwrap();

    let uploader = RecordingUploader::new();
    let started = Instant::now();
    let summary = collector(temp_dir.path(), 500, Duration::from_secs(30))
        .upload_with(uploader.clone())
        .await;
    let elapsed = started.elapsed();

    assert_eq!(summary.state, RunState::DeadlineExceeded);
    assert_eq!(summary.missing, vec![ArtifactKind::Profile]);
    assert!(summary.succeeded(ArtifactKind::Topology));
    assert!(summary.succeeded(ArtifactKind::TrackFiles));
    assert!(elapsed >= Duration::from_millis(500));
    assert!(elapsed < Duration::from_secs(5), "returned after {:?}", elapsed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_late_success_does_not_change_summary() {
    init_test_logger();
    let temp_dir = TempDir::new().unwrap();

    let uploader = RecordingUploader::new();
    let summary = collector(temp_dir.path(), 200, Duration::from_millis(800))
        .upload_with(uploader.clone())
        .await;
    let snapshot = summary.clone();

    assert_eq!(summary.state, RunState::DeadlineExceeded);
    assert_eq!(summary.outcome(ArtifactKind::Profile), None);

    // The detached profile task keeps going and eventually uploads
    let waited = Instant::now();
    while !uploader.keys().contains(&"EG_test/EG_test.prof".to_string()) {
        assert!(waited.elapsed() < Duration::from_secs(10), "profile never uploaded");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    assert_eq!(summary, snapshot);
    assert_eq!(summary.missing, vec![ArtifactKind::Profile]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failures_before_deadline_report_no_missing() {
    init_test_logger();
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a.csv"), "track,a\n").unwrap();
    fs::write(temp_dir.path().join("b.csv"), "track,b\n").unwrap();

    let uploader = RecordingUploader::failing(&["EG_test/a.csv", "EG_test/EG_test.dot"]);
    let summary = collector(temp_dir.path(), 10_000, Duration::ZERO)
        .upload_with(uploader.clone())
        .await;

    assert_eq!(summary.state, RunState::AllCompleted);
    assert!(summary.missing.is_empty());
    assert_eq!(summary.outcome(ArtifactKind::Topology), Some(false));
    assert_eq!(summary.outcome(ArtifactKind::Profile), Some(true));
    assert_eq!(summary.outcome(ArtifactKind::TrackFiles), Some(false));
    // Track files stop at the first failure, b.csv is never tried
    assert_eq!(uploader.keys(), vec!["EG_test/EG_test.prof"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_repeated_runs_use_the_same_keys() {
    init_test_logger();
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a.csv"), "track,a\n").unwrap();

    let first = RecordingUploader::new();
    let second = RecordingUploader::new();
    let collector = collector(temp_dir.path(), 10_000, Duration::ZERO);
    collector.upload_with(first.clone()).await;
    collector.upload_with(second.clone()).await;

    assert_eq!(first.keys(), second.keys());
}

#[tokio::test]
async fn test_uploader_construction_failure_aborts() {
    init_test_logger();
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a.csv"), "track,a\n").unwrap();

    let config = DebugConfig::new(StorageConfig::S3 {
        bucket: String::new(),
        region: None,
        profile: None,
        endpoint: None,
    });

    let started = Instant::now();
    let summary = collect_and_upload(&sid(), temp_dir.path(), &config, Arc::new(|| "digraph {}".to_string())).await;

    assert_eq!(summary.state, RunState::Aborted);
    assert!(summary.outcomes.is_empty());
    assert!(summary.missing.is_empty());
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!temp_dir.path().join("EG_test.dot").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_local_storage_end_to_end() {
    init_test_logger();
    let temp_dir = TempDir::new().unwrap();
    let upload_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("video_1.csv"), "pts,dts\n1,1\n").unwrap();

    let config = config(10_000, upload_dir.path());
    let collector = Arc::new(
        DebugCollector::new(sid(), temp_dir.path(), config, Arc::new(|| "digraph egress {}".to_string()))
            .with_profiler(Arc::new(SlowProfiler(Duration::ZERO))),
    );

    let summary = collector.spawn().await.unwrap();

    assert_eq!(summary.state, RunState::AllCompleted);
    assert!(summary.all_succeeded());
    let session_dir = upload_dir.path().join("EG_test");
    assert_eq!(fs::read_to_string(session_dir.join("EG_test.dot")).unwrap(), "digraph egress {}");
    assert_eq!(fs::read_to_string(session_dir.join("video_1.csv")).unwrap(), "pts,dts\n1,1\n");
    assert!(session_dir.join("EG_test.prof").exists());
}
