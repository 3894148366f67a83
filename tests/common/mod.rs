//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use debug_collector::cloud::ArtifactUploader;
use debug_collector::models::{ContentKind, UploadReceipt};
use debug_collector::sources::{ProfileKind, ProfileSource};

/// Uploader that remembers every key it was asked to store.
#[derive(Default)]
pub struct RecordingUploader {
    keys: Mutex<Vec<String>>,
    failing: HashSet<String>,
    stalled_suffix: Option<String>,
}

impl RecordingUploader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail uploads for the given keys
    pub fn failing(keys: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            keys: Mutex::new(Vec::new()),
            failing: keys.iter().map(|k| k.to_string()).collect(),
            stalled_suffix: None,
        })
    }

    /// Hang on every key ending with `suffix`
    pub fn stalling(suffix: &str) -> Arc<Self> {
        Arc::new(Self {
            keys: Mutex::new(Vec::new()),
            failing: HashSet::new(),
            stalled_suffix: Some(suffix.to_string()),
        })
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys = self.keys.lock().unwrap().clone();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ArtifactUploader for RecordingUploader {
    async fn upload(
        &self,
        local_path: &Path,
        remote_key: &str,
        _content: ContentKind,
        _is_public: bool,
    ) -> Result<UploadReceipt> {
        if let Some(suffix) = &self.stalled_suffix {
            if remote_key.ends_with(suffix.as_str()) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
        }
        if self.failing.contains(remote_key) {
            return Err(anyhow!("upload of {} refused", remote_key));
        }
        let size = tokio::fs::metadata(local_path).await?.len();
        self.keys.lock().unwrap().push(remote_key.to_string());
        Ok(UploadReceipt { url: format!("mock://{}", remote_key), size, sha256: String::new() })
    }
}

/// Profiler that answers after a fixed delay.
pub struct SlowProfiler(pub Duration);

#[async_trait]
impl ProfileSource for SlowProfiler {
    async fn capture_profile(&self, _: ProfileKind, _: u64, _: u32) -> Result<Vec<u8>> {
        tokio::time::sleep(self.0).await;
        Ok(br#"{"slow":true}"#.to_vec())
    }
}

pub fn init_test_logger() {
    let _ = simplelog::TestLogger::init(log::LevelFilter::Debug, simplelog::Config::default());
}
