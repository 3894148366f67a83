use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::debug;

use crate::cloud::local::LocalUploader;
use crate::cloud::s3::S3Uploader;
use crate::cloud::sftp::{SFTPConfig, SftpUploader};
use crate::config::StorageConfig;
use crate::models::{ContentKind, UploadReceipt};

/// Ships a local file to remote storage.
///
/// Implementations bound every request by their own I/O timeout so a task
/// abandoned by the orchestrator still finishes eventually.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtifactUploader: Send + Sync {
    async fn upload(
        &self,
        local_path: &Path,
        remote_key: &str,
        content: ContentKind,
        is_public: bool,
    ) -> Result<UploadReceipt>;
}

/// Build the uploader described by `config`.
///
/// Only checks what can be checked offline; connectivity problems surface
/// on the first upload.
pub fn build_uploader(config: &StorageConfig, io_timeout: Duration) -> Result<Arc<dyn ArtifactUploader>> {
    debug!("Creating {} uploader", config.backend_name());

    let uploader: Arc<dyn ArtifactUploader> = match config {
        StorageConfig::S3 { bucket, region, profile, endpoint } => Arc::new(S3Uploader::new(
            bucket,
            region.as_deref(),
            profile.as_deref(),
            endpoint.as_deref(),
            io_timeout,
        )?),
        StorageConfig::Sftp { host, port, username, private_key_path, remote_path } => {
            Arc::new(SftpUploader::new(SFTPConfig {
                host: host.clone(),
                port: *port,
                username: username.clone(),
                private_key_path: private_key_path.clone(),
                remote_path: remote_path.clone(),
                connection_timeout: io_timeout,
            })?)
        }
        StorageConfig::Local { directory } => Arc::new(LocalUploader::new(directory, io_timeout)?),
    };

    Ok(uploader)
}

/// Reject keys that could escape the destination prefix
pub fn validate_remote_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(anyhow!("Remote key must not be empty"));
    }
    if key.starts_with('/') || key.starts_with('\\') {
        return Err(anyhow!("Remote key must be relative: {}", key));
    }
    if key.split(['/', '\\']).any(|part| part == ".." || part.is_empty()) {
        return Err(anyhow!("Remote key contains an invalid path component: {}", key));
    }
    Ok(())
}
