use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::debug;
use tokio::time::timeout;

use crate::cloud::uploader::{validate_remote_key, ArtifactUploader};
use crate::models::{ContentKind, UploadReceipt};
use crate::utils::hash::calculate_sha256_async;

/// Copies artifacts into a directory tree laid out like the remote store.
///
/// Meant for development machines and tests; `directory/{remote_key}` mirrors
/// the object key.
#[derive(Debug, Clone)]
pub struct LocalUploader {
    directory: PathBuf,
    io_timeout: Duration,
}

impl LocalUploader {
    pub fn new(directory: &Path, io_timeout: Duration) -> Result<Self> {
        fs::create_dir_all(directory)
            .context(format!("Failed to create upload directory {}", directory.display()))?;
        Ok(Self { directory: directory.to_path_buf(), io_timeout })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn destination(&self, remote_key: &str) -> PathBuf {
        remote_key
            .split('/')
            .fold(self.directory.clone(), |path, part| path.join(part))
    }

    async fn copy(&self, local_path: &Path, destination: &Path) -> Result<u64> {
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context(format!("Failed to create directory {}", parent.display()))?;
        }
        tokio::fs::copy(local_path, destination)
            .await
            .context(format!("Failed to copy {} to {}", local_path.display(), destination.display()))
    }
}

#[async_trait]
impl ArtifactUploader for LocalUploader {
    async fn upload(
        &self,
        local_path: &Path,
        remote_key: &str,
        _content: ContentKind,
        _is_public: bool,
    ) -> Result<UploadReceipt> {
        validate_remote_key(remote_key)?;

        let destination = self.destination(remote_key);
        debug!("Copying {} to {}", local_path.display(), destination.display());

        let size = timeout(self.io_timeout, self.copy(local_path, &destination))
            .await
            .map_err(|_| anyhow!("Copy timed out after {:?}", self.io_timeout))??;

        let sha256 = calculate_sha256_async(destination.clone())
            .await
            .context(format!("Failed to hash {}", destination.display()))?;

        Ok(UploadReceipt {
            url: format!("file://{}", destination.display()),
            size,
            sha256,
        })
    }
}
