use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future;
use log::{debug, error, info, warn};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::cloud::{build_uploader, ArtifactUploader};
use crate::collectors::slot::OutcomeSlot;
use crate::collectors::task::{ArtifactProducer, CollectionTask};
use crate::config::DebugConfig;
use crate::errors::DebugError;
use crate::models::{ArtifactKind, ArtifactSpec, CollectionOutcome, CollectionSummary, RunState, SessionId};
use crate::security::safe_error_message;
use crate::sources::{ProfileSource, RuntimeProfiler, TopologySource};

/// Collects the debug artifacts of one session and uploads them within a
/// fixed deadline.
///
/// Three tasks run concurrently: topology dump, profile snapshot and track
/// files. The orchestrator waits for all three or for the deadline,
/// whichever comes first. Tasks still running at the deadline are left to
/// finish on their own; their late results are not reported.
pub struct DebugCollector {
    session_id: SessionId,
    tmp_dir: PathBuf,
    config: DebugConfig,
    topology: Arc<dyn TopologySource>,
    profiler: Arc<dyn ProfileSource>,
}

impl DebugCollector {
    pub fn new(
        session_id: SessionId,
        tmp_dir: impl Into<PathBuf>,
        config: DebugConfig,
        topology: Arc<dyn TopologySource>,
    ) -> Self {
        Self {
            session_id,
            tmp_dir: tmp_dir.into(),
            config,
            topology,
            profiler: Arc::new(RuntimeProfiler::new()),
        }
    }

    /// Replace the default runtime profiler
    pub fn with_profiler(mut self, profiler: Arc<dyn ProfileSource>) -> Self {
        self.profiler = profiler;
        self
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    /// Build the configured uploader and run the collection.
    ///
    /// Never fails: if the configuration is invalid or the uploader cannot be
    /// built the error is logged and an `Aborted` summary is returned without
    /// running any task.
    pub async fn upload_debug_files(&self) -> CollectionSummary {
        let started_at = Utc::now().to_rfc3339();
        let started = Instant::now();

        if let Err(source) = self.config.validate() {
            return self.abort(DebugError::InvalidConfig { source }, started_at, started);
        }

        match build_uploader(&self.config.storage, self.config.io_timeout()) {
            Ok(uploader) => self.collect(uploader, started_at, started).await,
            Err(source) => self.abort(DebugError::ConstructionFailure { source }, started_at, started),
        }
    }

    /// Run the collection with an already built uploader.
    pub async fn upload_with(&self, uploader: Arc<dyn ArtifactUploader>) -> CollectionSummary {
        let started_at = Utc::now().to_rfc3339();
        let started = Instant::now();

        if let Err(source) = self.config.validate() {
            return self.abort(DebugError::InvalidConfig { source }, started_at, started);
        }

        self.collect(uploader, started_at, started).await
    }

    async fn collect(
        &self,
        uploader: Arc<dyn ArtifactUploader>,
        started_at: String,
        started: Instant,
    ) -> CollectionSummary {
        let deadline = self.config.deadline();

        let slots: Vec<(ArtifactKind, Arc<OutcomeSlot>)> = ArtifactKind::ALL
            .iter()
            .map(|kind| (*kind, Arc::new(OutcomeSlot::new())))
            .collect();

        let handles: Vec<JoinHandle<bool>> = slots
            .iter()
            .map(|(kind, slot)| {
                let task = self.build_task(*kind, Arc::clone(&uploader), Arc::clone(slot));
                tokio::spawn(task.run())
            })
            .collect();

        debug!(
            "Started {} debug upload tasks for session {} (deadline {:?})",
            handles.len(),
            self.session_id,
            deadline
        );

        // Dropping the join future at the deadline detaches the tasks; it does not abort them.
        let state = tokio::select! {
            biased;
            results = future::join_all(handles) => {
                for result in results {
                    if let Err(e) = result {
                        error!("Debug upload task for session {} did not finish: {}", self.session_id, e);
                    }
                }
                info!("debug files uploaded for session {}", self.session_id);
                RunState::AllCompleted
            }
            _ = sleep(deadline) => {
                for (_, slot) in &slots {
                    slot.abandon();
                }
                RunState::DeadlineExceeded
            }
        };

        let mut outcomes = Vec::new();
        let mut missing = Vec::new();
        for (kind, slot) in &slots {
            let stage = slot.stage();
            let outcome = slot.outcome();
            if let Some(succeeded) = outcome {
                outcomes.push(CollectionOutcome { kind: *kind, succeeded });
            }
            if state == RunState::DeadlineExceeded && outcome != Some(true) {
                warn!("failed to upload {} for session {} (task {} at deadline)", kind, self.session_id, stage);
                missing.push(*kind);
            }
        }

        CollectionSummary {
            session_id: self.session_id.to_string(),
            started_at,
            elapsed: started.elapsed(),
            state,
            outcomes,
            missing,
        }
    }

    fn abort(&self, err: DebugError, started_at: String, started: Instant) -> CollectionSummary {
        error!("{}", safe_error_message(&format!("Session {}", self.session_id), &err));
        CollectionSummary {
            session_id: self.session_id.to_string(),
            started_at,
            elapsed: started.elapsed(),
            state: RunState::Aborted,
            outcomes: Vec::new(),
            missing: Vec::new(),
        }
    }

    /// Run the collection in the background
    pub fn spawn(self: Arc<Self>) -> JoinHandle<CollectionSummary> {
        tokio::spawn(async move { self.upload_debug_files().await })
    }

    fn build_task(&self, kind: ArtifactKind, uploader: Arc<dyn ArtifactUploader>, slot: Arc<OutcomeSlot>) -> CollectionTask {
        let (spec, producer) = match kind {
            ArtifactKind::Topology => (ArtifactSpec::topology(), ArtifactProducer::Topology(Arc::clone(&self.topology))),
            ArtifactKind::Profile => (
                ArtifactSpec::profile(),
                ArtifactProducer::Profile {
                    source: Arc::clone(&self.profiler),
                    settings: self.config.profile.clone(),
                },
            ),
            ArtifactKind::TrackFiles => (
                ArtifactSpec::track_files(&self.config.track_file_suffix),
                ArtifactProducer::TrackFiles,
            ),
        };

        CollectionTask::new(spec, producer, self.session_id.clone(), self.tmp_dir.clone(), uploader, slot)
    }
}

/// Collect and upload the debug artifacts of `session_id` found in `tmp_dir`.
///
/// Convenience wrapper around [`DebugCollector::upload_debug_files`] using
/// the default runtime profiler.
pub async fn collect_and_upload(
    session_id: &SessionId,
    tmp_dir: &Path,
    config: &DebugConfig,
    topology: Arc<dyn TopologySource>,
) -> CollectionSummary {
    DebugCollector::new(session_id.clone(), tmp_dir, config.clone(), topology)
        .upload_debug_files()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::uploader::MockArtifactUploader;
    use crate::config::StorageConfig;
    use crate::models::UploadReceipt;
    use crate::sources::ProfileKind;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::time::Duration;
    use tempfile::TempDir;

    struct StaticProfiler;

    #[async_trait]
    impl ProfileSource for StaticProfiler {
        async fn capture_profile(&self, _: ProfileKind, _: u64, _: u32) -> anyhow::Result<Vec<u8>> {
            Ok(b"{}".to_vec())
        }
    }

    struct StalledProfiler;

    #[async_trait]
    impl ProfileSource for StalledProfiler {
        async fn capture_profile(&self, _: ProfileKind, _: u64, _: u32) -> anyhow::Result<Vec<u8>> {
            sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    fn collector(tmp_dir: &Path, deadline_ms: u64, profiler: Arc<dyn ProfileSource>) -> DebugCollector {
        let mut config = DebugConfig::new(StorageConfig::Local { directory: tmp_dir.join("uploads") });
        config.deadline_ms = deadline_ms;
        DebugCollector::new(
            SessionId::new("EG_1").unwrap(),
            tmp_dir,
            config,
            Arc::new(|| "digraph {}".to_string()),
        )
        .with_profiler(profiler)
    }

    fn ok_receipt() -> anyhow::Result<UploadReceipt> {
        Ok(UploadReceipt { url: "mock://".to_string(), size: 1, sha256: String::new() })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_all_tasks_complete() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.csv"), b"x").unwrap();

        let mut uploader = MockArtifactUploader::new();
        uploader.expect_upload().times(3).returning(|_, _, _, _| ok_receipt());

        let summary = collector(temp_dir.path(), 10_000, Arc::new(StaticProfiler))
            .upload_with(Arc::new(uploader))
            .await;

        assert_eq!(summary.state, RunState::AllCompleted);
        assert!(summary.all_succeeded());
        assert!(summary.missing.is_empty());
        assert_eq!(summary.session_id, "EG_1");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failures_before_deadline_are_not_deadline_warnings() {
        let temp_dir = TempDir::new().unwrap();

        let mut uploader = MockArtifactUploader::new();
        uploader.expect_upload().returning(|_, _, _, _| Err(anyhow!("denied")));

        let summary = collector(temp_dir.path(), 10_000, Arc::new(StaticProfiler))
            .upload_with(Arc::new(uploader))
            .await;

        assert_eq!(summary.state, RunState::AllCompleted);
        assert!(summary.missing.is_empty());
        assert_eq!(summary.outcome(ArtifactKind::Topology), Some(false));
        assert_eq!(summary.outcome(ArtifactKind::Profile), Some(false));
        // No track files: nothing to upload counts as success
        assert_eq!(summary.outcome(ArtifactKind::TrackFiles), Some(true));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stalled_profile_hits_deadline() {
        let temp_dir = TempDir::new().unwrap();

        let mut uploader = MockArtifactUploader::new();
        uploader.expect_upload().returning(|_, _, _, _| ok_receipt());

        let started = Instant::now();
        let summary = collector(temp_dir.path(), 300, Arc::new(StalledProfiler))
            .upload_with(Arc::new(uploader))
            .await;
        let elapsed = started.elapsed();

        assert_eq!(summary.state, RunState::DeadlineExceeded);
        assert_eq!(summary.missing, vec![ArtifactKind::Profile]);
        assert_eq!(summary.outcome(ArtifactKind::Profile), None);
        assert!(summary.succeeded(ArtifactKind::Topology));
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_construction_failure_aborts() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();

        let config = DebugConfig::new(StorageConfig::Local { directory: blocker.join("uploads") });
        let collector = DebugCollector::new(
            SessionId::new("EG_1").unwrap(),
            temp_dir.path(),
            config,
            Arc::new(|| "digraph {}".to_string()),
        );

        let summary = collector.upload_debug_files().await;
        assert_eq!(summary.state, RunState::Aborted);
        assert!(summary.outcomes.is_empty());
        assert!(!temp_dir.path().join("EG_1.dot").exists());
    }

    #[tokio::test]
    async fn test_empty_track_suffix_aborts() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), b"x").unwrap();

        let mut uploader = MockArtifactUploader::new();
        uploader.expect_upload().times(0);

        let mut collector = collector(temp_dir.path(), 10_000, Arc::new(StaticProfiler));
        collector.config.track_file_suffix = String::new();

        let summary = collector.upload_with(Arc::new(uploader)).await;
        assert_eq!(summary.state, RunState::Aborted);
        assert!(summary.outcomes.is_empty());

        let summary = collector.upload_debug_files().await;
        assert_eq!(summary.state, RunState::Aborted);
        assert!(!temp_dir.path().join("uploads").exists());
    }

    #[tokio::test]
    async fn test_elapsed_includes_uploader_construction() {
        let temp_dir = TempDir::new().unwrap();
        let collector = collector(temp_dir.path(), 10_000, Arc::new(StaticProfiler));

        let before = Utc::now();
        let summary = collector.upload_debug_files().await;

        assert_eq!(summary.state, RunState::AllCompleted);
        let started_at = chrono::DateTime::parse_from_rfc3339(&summary.started_at).unwrap();
        assert!(started_at >= before);
        assert!(summary.elapsed > Duration::ZERO);
        // The local uploader was built inside the measured window
        assert!(temp_dir.path().join("uploads").join("EG_1").join("EG_1.dot").exists());
    }
}
