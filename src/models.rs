use std::fmt;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{
    CONTENT_TYPE_BLOB, CONTENT_TYPE_CSV, CONTENT_TYPE_GRAPHVIZ, CONTENT_TYPE_JSON,
    PROFILE_EXTENSION, TOPOLOGY_EXTENSION,
};

/// The three kinds of debug artifact collected per run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Topology,
    Profile,
    TrackFiles,
}

impl ArtifactKind {
    /// All kinds, in the order they are spawned and reported.
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Topology,
        ArtifactKind::Profile,
        ArtifactKind::TrackFiles,
    ];

    /// Human readable label used in log lines
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::Topology => "dotfile",
            ArtifactKind::Profile => "profile file",
            ArtifactKind::TrackFiles => "track debug files",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What to collect for one artifact kind.
///
/// `pattern` is the local file extension for byte-producing artifacts
/// (`.dot`, `.prof`) and the file name suffix filter for track files.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSpec {
    pub kind: ArtifactKind,
    pub pattern: String,
}

impl ArtifactSpec {
    pub fn topology() -> Self {
        Self { kind: ArtifactKind::Topology, pattern: TOPOLOGY_EXTENSION.to_string() }
    }

    pub fn profile() -> Self {
        Self { kind: ArtifactKind::Profile, pattern: PROFILE_EXTENSION.to_string() }
    }

    pub fn track_files(suffix: &str) -> Self {
        Self { kind: ArtifactKind::TrackFiles, pattern: suffix.to_string() }
    }

    /// Content kind reported to the uploader for files of this spec
    pub fn content_kind(&self) -> ContentKind {
        match self.kind {
            ArtifactKind::Topology => ContentKind::Graphviz,
            ArtifactKind::Profile => ContentKind::Json,
            ArtifactKind::TrackFiles if self.pattern.eq_ignore_ascii_case(".csv") => ContentKind::Csv,
            ArtifactKind::TrackFiles => ContentKind::Blob,
        }
    }
}

/// Per-task result. Written once by the task that owns it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionOutcome {
    pub kind: ArtifactKind,
    pub succeeded: bool,
}

/// Identifier of the session whose artifacts are being collected.
///
/// Used both as the local file stem and as the remote key prefix, so it must
/// be a single path component.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(anyhow!("Session id must not be empty"));
        }
        if id.contains('/') || id.contains('\\') || id == "." || id == ".." {
            return Err(anyhow!("Session id must be a single path component: {}", id));
        }
        Ok(Self(id))
    }

    /// Generate a fresh random session id
    pub fn generate() -> Self {
        Self(format!("DS_{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SessionId {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        SessionId::new(value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remote location of one uploaded file: `{base_key}/{filename}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadDestination {
    pub base_key: String,
    pub filename: String,
}

impl UploadDestination {
    pub fn new(session_id: &SessionId, filename: impl Into<String>) -> Self {
        Self { base_key: session_id.as_str().to_string(), filename: filename.into() }
    }

    pub fn key(&self) -> String {
        format!("{}/{}", self.base_key, self.filename)
    }
}

impl fmt::Display for UploadDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base_key, self.filename)
    }
}

/// Content classification passed through to the storage backend.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Blob,
    Graphviz,
    Json,
    Csv,
}

impl ContentKind {
    pub fn content_type(&self) -> &'static str {
        match self {
            ContentKind::Blob => CONTENT_TYPE_BLOB,
            ContentKind::Graphviz => CONTENT_TYPE_GRAPHVIZ,
            ContentKind::Json => CONTENT_TYPE_JSON,
            ContentKind::Csv => CONTENT_TYPE_CSV,
        }
    }
}

/// What an uploader hands back for a stored file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub url: String,
    pub size: u64,
    pub sha256: String,
}

/// Progress of a single collection task.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TaskStage {
    Pending = 0,
    Collecting = 1,
    Writing = 2,
    Uploading = 3,
    Succeeded = 4,
    Failed = 5,
}

impl TaskStage {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => TaskStage::Collecting,
            2 => TaskStage::Writing,
            3 => TaskStage::Uploading,
            4 => TaskStage::Succeeded,
            5 => TaskStage::Failed,
            _ => TaskStage::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStage::Succeeded | TaskStage::Failed)
    }
}

impl fmt::Display for TaskStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskStage::Pending => "pending",
            TaskStage::Collecting => "collecting",
            TaskStage::Writing => "writing",
            TaskStage::Uploading => "uploading",
            TaskStage::Succeeded => "succeeded",
            TaskStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How an orchestrator run ended.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// All three tasks finished before the deadline
    AllCompleted,
    /// The deadline fired first; unfinished tasks were left running
    DeadlineExceeded,
    /// No uploader could be built, nothing ran
    Aborted,
}

/// Snapshot of a run, taken when the orchestrator stops waiting.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CollectionSummary {
    pub session_id: String,
    pub started_at: String,
    pub elapsed: Duration,
    pub state: RunState,
    /// Outcomes of the tasks that had finished when the snapshot was taken
    pub outcomes: Vec<CollectionOutcome>,
    /// Kinds reported as failed at the deadline (empty unless `DeadlineExceeded`)
    pub missing: Vec<ArtifactKind>,
}

impl CollectionSummary {
    /// Outcome of `kind`, `None` if its task had not finished
    pub fn outcome(&self, kind: ArtifactKind) -> Option<bool> {
        self.outcomes.iter().find(|o| o.kind == kind).map(|o| o.succeeded)
    }

    pub fn succeeded(&self, kind: ArtifactKind) -> bool {
        self.outcome(kind).unwrap_or(false)
    }

    pub fn all_succeeded(&self) -> bool {
        ArtifactKind::ALL.iter().all(|kind| self.succeeded(*kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_validation() {
        assert!(SessionId::new("EG_abc123").is_ok());
        assert!(SessionId::new("").is_err());
        assert!(SessionId::new("a/b").is_err());
        assert!(SessionId::new("..").is_err());
        assert!(SessionId::new("a\\b").is_err());
    }

    #[test]
    fn test_generated_session_ids_are_distinct() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("DS_"));
    }

    #[test]
    fn test_upload_destination_key() {
        let sid = SessionId::new("EG_1").unwrap();
        let dest = UploadDestination::new(&sid, "EG_1.dot");
        assert_eq!(dest.key(), "EG_1/EG_1.dot");
        assert_eq!(dest.to_string(), dest.key());
    }

    #[test]
    fn test_content_kind_for_specs() {
        assert_eq!(ArtifactSpec::topology().content_kind(), ContentKind::Graphviz);
        assert_eq!(ArtifactSpec::profile().content_kind(), ContentKind::Json);
        assert_eq!(ArtifactSpec::track_files(".csv").content_kind(), ContentKind::Csv);
        assert_eq!(ArtifactSpec::track_files(".log").content_kind(), ContentKind::Blob);
        assert_eq!(ContentKind::Csv.content_type(), "text/csv");
    }

    #[test]
    fn test_task_stage_round_trip_through_u8() {
        for stage in [
            TaskStage::Pending,
            TaskStage::Collecting,
            TaskStage::Writing,
            TaskStage::Uploading,
            TaskStage::Succeeded,
            TaskStage::Failed,
        ] {
            assert_eq!(TaskStage::from_u8(stage as u8), stage);
        }
        assert_eq!(TaskStage::from_u8(200), TaskStage::Pending);
        assert!(TaskStage::Failed.is_terminal());
        assert!(!TaskStage::Uploading.is_terminal());
    }

    #[test]
    fn test_summary_lookups() {
        let summary = CollectionSummary {
            session_id: "s".to_string(),
            started_at: String::new(),
            elapsed: Duration::from_millis(10),
            state: RunState::DeadlineExceeded,
            outcomes: vec![
                CollectionOutcome { kind: ArtifactKind::Topology, succeeded: true },
                CollectionOutcome { kind: ArtifactKind::TrackFiles, succeeded: false },
            ],
            missing: vec![ArtifactKind::Profile, ArtifactKind::TrackFiles],
        };
        assert_eq!(summary.outcome(ArtifactKind::Topology), Some(true));
        assert_eq!(summary.outcome(ArtifactKind::Profile), None);
        assert!(!summary.succeeded(ArtifactKind::TrackFiles));
        assert!(!summary.all_succeeded());
    }
}
