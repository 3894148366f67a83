use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::env_vars::expand_env_vars;
use crate::constants::{
    DEFAULT_DEADLINE, DEFAULT_IO_TIMEOUT_SECS, DEFAULT_TRACK_FILE_SUFFIX, SFTP_DEFAULT_PORT,
};
use crate::sources::ProfileKind;

/// Where debug artifacts are shipped.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    S3 {
        bucket: String,
        #[serde(default)]
        region: Option<String>,
        /// AWS credentials profile
        #[serde(default)]
        profile: Option<String>,
        /// Custom endpoint for S3-compatible stores
        #[serde(default)]
        endpoint: Option<String>,
    },
    Sftp {
        host: String,
        #[serde(default = "default_sftp_port")]
        port: u16,
        username: String,
        private_key_path: PathBuf,
        remote_path: String,
    },
    Local {
        directory: PathBuf,
    },
}

impl StorageConfig {
    /// Short backend name for log lines
    pub fn backend_name(&self) -> &'static str {
        match self {
            StorageConfig::S3 { .. } => "s3",
            StorageConfig::Sftp { .. } => "sftp",
            StorageConfig::Local { .. } => "local",
        }
    }

    fn expand_environment(&mut self) {
        match self {
            StorageConfig::S3 { bucket, region, profile, endpoint } => {
                *bucket = expand_env_vars(bucket);
                for value in [region, profile, endpoint].into_iter().flatten() {
                    *value = expand_env_vars(value);
                }
            }
            StorageConfig::Sftp { host, username, private_key_path, remote_path, .. } => {
                *host = expand_env_vars(host);
                *username = expand_env_vars(username);
                *private_key_path = PathBuf::from(expand_env_vars(&private_key_path.to_string_lossy()));
                *remote_path = expand_env_vars(remote_path);
            }
            StorageConfig::Local { directory } => {
                *directory = PathBuf::from(expand_env_vars(&directory.to_string_lossy()));
            }
        }
    }
}

/// Parameters handed to the profile source.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProfileSettings {
    #[serde(default)]
    pub kind: ProfileKind,
    /// Sampling window; 0 takes an instantaneous snapshot
    #[serde(default)]
    pub duration_secs: u64,
    #[serde(default)]
    pub rate_hint: u32,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self { kind: ProfileKind::default(), duration_secs: 0, rate_hint: 0 }
    }
}

/// Configuration of one debug upload run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DebugConfig {
    /// Deadline shared by all three collection tasks
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
    #[serde(default = "default_track_file_suffix")]
    pub track_file_suffix: String,
    /// Upper bound for a single upload request
    #[serde(default = "default_io_timeout_secs")]
    pub io_timeout_secs: u64,
    #[serde(default)]
    pub profile: ProfileSettings,
    pub storage: StorageConfig,
}

fn default_deadline_ms() -> u64 {
    DEFAULT_DEADLINE.as_millis() as u64
}

fn default_track_file_suffix() -> String {
    DEFAULT_TRACK_FILE_SUFFIX.to_string()
}

fn default_io_timeout_secs() -> u64 {
    DEFAULT_IO_TIMEOUT_SECS
}

fn default_sftp_port() -> u16 {
    SFTP_DEFAULT_PORT
}

impl DebugConfig {
    /// Config with defaults for everything but the storage backend
    pub fn new(storage: StorageConfig) -> Self {
        Self {
            deadline_ms: default_deadline_ms(),
            track_file_suffix: default_track_file_suffix(),
            io_timeout_secs: default_io_timeout_secs(),
            profile: ProfileSettings::default(),
            storage,
        }
    }

    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config = Self::from_yaml_str(&content)?;
        debug!("Loaded debug upload configuration from {}", path.display());
        Ok(config)
    }

    /// Parse, expand environment variables and validate a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let mut config: DebugConfig = serde_yaml::from_str(content)
            .context("Failed to parse YAML config")?;
        config.process_environment_variables();
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save_to_yaml_file(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .context(format!("Failed to write config to {}", path.display()))?;

        info!("Saved debug upload configuration to {}", path.display());
        Ok(())
    }

    /// Expand `$VAR` / `${VAR}` in the storage section
    pub fn process_environment_variables(&mut self) {
        self.storage.expand_environment();
    }

    pub fn validate(&self) -> Result<()> {
        if self.deadline_ms == 0 {
            return Err(anyhow!("deadline_ms must be greater than zero"));
        }
        if self.io_timeout_secs == 0 {
            return Err(anyhow!("io_timeout_secs must be greater than zero"));
        }
        if self.track_file_suffix.is_empty() {
            return Err(anyhow!("track_file_suffix must not be empty"));
        }
        Ok(())
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }
}
