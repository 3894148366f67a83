use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info};

use crate::cloud::ArtifactUploader;
use crate::collectors::slot::OutcomeSlot;
use crate::config::ProfileSettings;
use crate::errors::DebugError;
use crate::models::{ArtifactKind, ArtifactSpec, SessionId, TaskStage, UploadDestination, UploadReceipt};
use crate::security::safe_error_message;
use crate::sources::{ProfileSource, TopologySource};

/// Where a task gets its artifact from.
#[derive(Clone)]
pub enum ArtifactProducer {
    Topology(Arc<dyn TopologySource>),
    Profile {
        source: Arc<dyn ProfileSource>,
        settings: ProfileSettings,
    },
    /// Files already present in the session temp directory
    TrackFiles,
}

/// Collect one artifact, persist it locally and upload it.
///
/// Every failure is logged where it happens and turned into a `false`
/// outcome. Local temp files are left in place.
pub struct CollectionTask {
    spec: ArtifactSpec,
    producer: ArtifactProducer,
    session_id: SessionId,
    tmp_dir: PathBuf,
    uploader: Arc<dyn ArtifactUploader>,
    slot: Arc<OutcomeSlot>,
}

impl CollectionTask {
    pub fn new(
        spec: ArtifactSpec,
        producer: ArtifactProducer,
        session_id: SessionId,
        tmp_dir: PathBuf,
        uploader: Arc<dyn ArtifactUploader>,
        slot: Arc<OutcomeSlot>,
    ) -> Self {
        Self { spec, producer, session_id, tmp_dir, uploader, slot }
    }

    pub fn kind(&self) -> ArtifactKind {
        self.spec.kind
    }

    /// Run to completion, record the outcome in the slot and return it.
    ///
    /// Once the orchestrator has given up on this task the outcome is still
    /// recorded but nothing more is logged; the deadline warning already
    /// covered this kind.
    pub async fn run(self) -> bool {
        let kind = self.spec.kind;
        let result = match &self.producer {
            ArtifactProducer::TrackFiles => self.upload_track_files().await,
            producer => match self.produce_bytes(producer).await {
                Ok(data) => self.upload_bytes(&data).await,
                Err(e) => Err(e),
            },
        };

        let succeeded = result.is_ok();
        self.slot.complete(succeeded);
        if self.slot.is_abandoned() {
            return succeeded;
        }

        match result {
            Ok(receipts) => {
                let bytes: u64 = receipts.iter().map(|r| r.size).sum();
                info!("Uploaded {} for session {} ({} files, {} bytes)", kind, self.session_id, receipts.len(), bytes);
            }
            Err(e) => {
                error!("{}", safe_error_message(&format!("Session {}", self.session_id), &e));
            }
        }
        succeeded
    }

    async fn produce_bytes(&self, producer: &ArtifactProducer) -> Result<Vec<u8>, DebugError> {
        self.slot.advance(TaskStage::Collecting);
        let kind = self.spec.kind;

        match producer {
            ArtifactProducer::Topology(source) => Ok(source.dump_topology().into_bytes()),
            ArtifactProducer::Profile { source, settings } => source
                .capture_profile(settings.kind, settings.duration_secs, settings.rate_hint)
                .await
                .map_err(|source| DebugError::SourceUnavailable { kind, source }),
            ArtifactProducer::TrackFiles => Err(DebugError::SourceUnavailable {
                kind,
                source: anyhow::anyhow!("track files do not produce bytes"),
            }),
        }
    }

    /// Write `{session_id}{extension}` into the temp dir and upload it
    async fn upload_bytes(&self, data: &[u8]) -> Result<Vec<UploadReceipt>, DebugError> {
        self.slot.advance(TaskStage::Writing);

        let filename = format!("{}{}", self.session_id, self.spec.pattern);
        let local = self.tmp_dir.join(&filename);
        tokio::fs::write(&local, data).await.map_err(|e| DebugError::WriteFailure {
            kind: self.spec.kind,
            path: local.display().to_string(),
            source: e.into(),
        })?;
        if !self.slot.is_abandoned() {
            debug!("Wrote {} bytes to {}", data.len(), local.display());
        }

        self.slot.advance(TaskStage::Uploading);
        let receipt = self.upload_file(&local, filename).await?;
        Ok(vec![receipt])
    }

    /// Upload every matching file of the temp dir, stopping at the first failure
    async fn upload_track_files(&self) -> Result<Vec<UploadReceipt>, DebugError> {
        self.slot.advance(TaskStage::Collecting);

        let names = list_regular_files(&self.tmp_dir).await.map_err(|source| DebugError::SourceUnavailable {
            kind: self.spec.kind,
            source,
        })?;
        let selected = select_track_files(names, &self.spec.pattern);
        if !self.slot.is_abandoned() {
            debug!("Selected {} track files in {}", selected.len(), self.tmp_dir.display());
        }

        self.slot.advance(TaskStage::Uploading);
        let mut receipts = Vec::with_capacity(selected.len());
        for name in selected {
            let local = self.tmp_dir.join(&name);
            receipts.push(self.upload_file(&local, name).await?);
        }
        Ok(receipts)
    }

    async fn upload_file(&self, local: &Path, filename: String) -> Result<UploadReceipt, DebugError> {
        let destination = UploadDestination::new(&self.session_id, filename);
        let key = destination.key();

        self.uploader
            .upload(local, &key, self.spec.content_kind(), false)
            .await
            .map_err(|source| DebugError::UploadFailure { kind: self.spec.kind, key, source })
    }
}

/// Names of the regular files directly inside `dir`
async fn list_regular_files(dir: &Path) -> anyhow::Result<Vec<String>> {
    use anyhow::Context;

    let mut entries = tokio::fs::read_dir(dir)
        .await
        .context(format!("Failed to read directory {}", dir.display()))?;

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .context(format!("Failed to read directory {}", dir.display()))?
    {
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => debug!("Skipping non UTF-8 file name {:?}", name),
        }
    }
    Ok(names)
}

/// Keep the names ending with `suffix`, sorted so uploads happen in a stable order
pub fn select_track_files<I>(names: I, suffix: &str) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut selected: Vec<String> = names
        .into_iter()
        .filter(|name| name.ends_with(suffix))
        .collect();
    selected.sort();
    selected
}
