//! Failure taxonomy for debug artifact collection.
//!
//! None of these ever reach the caller of the orchestrator. They are built at
//! the point of failure, logged, and folded into a `false` outcome.

use thiserror::Error;

use crate::models::ArtifactKind;

#[derive(Debug, Error)]
pub enum DebugError {
    /// The artifact could not be produced or the source files not listed
    #[error("{kind} source unavailable: {source:#}")]
    SourceUnavailable {
        kind: ArtifactKind,
        #[source]
        source: anyhow::Error,
    },

    /// The local temp copy could not be written
    #[error("failed to write {kind} to {path}: {source:#}")]
    WriteFailure {
        kind: ArtifactKind,
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// The remote transport rejected or timed out the upload
    #[error("failed to upload {kind} to {key}: {source:#}")]
    UploadFailure {
        kind: ArtifactKind,
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// The configuration failed validation, nothing was attempted
    #[error("invalid debug configuration: {source:#}")]
    InvalidConfig {
        #[source]
        source: anyhow::Error,
    },

    /// No uploader could be built from the storage configuration
    #[error("failed to create uploader: {source:#}")]
    ConstructionFailure {
        #[source]
        source: anyhow::Error,
    },
}

impl DebugError {
    pub fn kind(&self) -> Option<ArtifactKind> {
        match self {
            DebugError::SourceUnavailable { kind, .. }
            | DebugError::WriteFailure { kind, .. }
            | DebugError::UploadFailure { kind, .. } => Some(*kind),
            DebugError::InvalidConfig { .. } | DebugError::ConstructionFailure { .. } => None,
        }
    }
}
