use std::fs;
use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::debug;
use ssh2::{Session, Sftp};

use crate::cloud::uploader::{validate_remote_key, ArtifactUploader};
use crate::constants::{
    DEFAULT_IO_TIMEOUT_SECS, ERROR_AUTHENTICATION_FAILED, ERROR_FAILED_TO_CREATE_SESSION,
    ERROR_FAILED_TO_CREATE_SFTP, SFTP_DEFAULT_PORT,
};
use crate::models::{ContentKind, UploadReceipt};
use crate::security::scrub_path;
use crate::utils::hash::calculate_sha256;

/// Configuration for SFTP uploads
#[derive(Clone, Debug)]
pub struct SFTPConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub private_key_path: PathBuf,
    pub remote_path: String,
    /// Bounds connect, read and write on the SSH socket
    pub connection_timeout: Duration,
}

impl Default for SFTPConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: SFTP_DEFAULT_PORT,
            username: String::new(),
            private_key_path: PathBuf::new(),
            remote_path: String::new(),
            connection_timeout: Duration::from_secs(DEFAULT_IO_TIMEOUT_SECS),
        }
    }
}

/// Uploads debug artifacts over SFTP.
///
/// ssh2 is blocking, so every upload runs a fresh session on the blocking
/// pool. The socket timeouts keep an abandoned upload from hanging forever.
#[derive(Debug)]
pub struct SftpUploader {
    config: SFTPConfig,
}

impl SftpUploader {
    pub fn new(config: SFTPConfig) -> Result<Self> {
        if config.host.is_empty() {
            return Err(anyhow!("SFTP host must not be empty"));
        }
        if config.username.is_empty() {
            return Err(anyhow!("SFTP username must not be empty"));
        }
        if !config.private_key_path.is_file() {
            return Err(anyhow!(
                "SFTP private key not found: {}",
                scrub_path(&config.private_key_path.to_string_lossy())
            ));
        }
        Ok(Self { config })
    }

    fn remote_file_path(&self, remote_key: &str) -> String {
        format!("{}/{}", self.config.remote_path.trim_end_matches('/'), remote_key)
    }

    fn url(&self, remote_file: &str) -> String {
        format!("sftp://{}:{}{}", self.config.host, self.config.port, remote_file)
    }
}

/// Open an authenticated SSH session
fn create_session(config: &SFTPConfig) -> Result<Session> {
    let addr = (config.host.as_str(), config.port)
        .to_socket_addrs()
        .context(format!("Failed to resolve {}:{}", config.host, config.port))?
        .next()
        .ok_or_else(|| anyhow!("No address found for {}:{}", config.host, config.port))?;

    let tcp = TcpStream::connect_timeout(&addr, config.connection_timeout)
        .context(format!("Failed to connect to {}:{}", config.host, config.port))?;
    tcp.set_read_timeout(Some(config.connection_timeout))
        .context("Failed to set read timeout")?;
    tcp.set_write_timeout(Some(config.connection_timeout))
        .context("Failed to set write timeout")?;

    let mut session = Session::new().context(ERROR_FAILED_TO_CREATE_SESSION)?;
    session.set_timeout(config.connection_timeout.as_millis().min(u32::MAX as u128) as u32);
    session.set_tcp_stream(tcp);
    session.handshake().context("Failed to perform SSH handshake")?;

    session
        .userauth_pubkey_file(&config.username, None, &config.private_key_path, None)
        .context(ERROR_AUTHENTICATION_FAILED)?;

    if !session.authenticated() {
        return Err(anyhow!(ERROR_AUTHENTICATION_FAILED));
    }

    Ok(session)
}

/// `mkdir -p` for the parent directories of `remote_file`
fn ensure_remote_dirs(sftp: &Sftp, remote_file: &str) -> Result<()> {
    let Some(parent) = Path::new(remote_file).parent() else {
        return Ok(());
    };

    let mut current = PathBuf::new();
    for component in parent.components() {
        current.push(component);
        if current.as_os_str().is_empty() || current == Path::new("/") {
            continue;
        }
        if sftp.stat(&current).is_err() {
            sftp.mkdir(&current, 0o755)
                .context(format!("Failed to create remote directory {}", current.display()))?;
        }
    }
    Ok(())
}

fn upload_blocking(config: &SFTPConfig, local_path: &Path, remote_file: &str) -> Result<u64> {
    let session = create_session(config)?;
    let sftp = session.sftp().context(ERROR_FAILED_TO_CREATE_SFTP)?;

    ensure_remote_dirs(&sftp, remote_file)?;

    let mut local_file = fs::File::open(local_path)
        .context(format!("Failed to open local file: {}", local_path.display()))?;
    // create() truncates an existing file
    let mut remote = sftp
        .create(Path::new(remote_file))
        .context(format!("Failed to create remote file: {}", remote_file))?;

    let written = io::copy(&mut local_file, &mut remote)
        .context(format!("Failed to write to remote file: {}", remote_file))?;
    Ok(written)
}

#[async_trait]
impl ArtifactUploader for SftpUploader {
    async fn upload(
        &self,
        local_path: &Path,
        remote_key: &str,
        _content: ContentKind,
        _is_public: bool,
    ) -> Result<UploadReceipt> {
        validate_remote_key(remote_key)?;

        let remote_file = self.remote_file_path(remote_key);
        debug!("Uploading {} to {}", local_path.display(), self.url(&remote_file));

        let config = self.config.clone();
        let local = local_path.to_path_buf();
        let target = remote_file.clone();
        let (size, sha256) = tokio::task::spawn_blocking(move || -> Result<(u64, String)> {
            let size = upload_blocking(&config, &local, &target)?;
            let sha256 = calculate_sha256(&local)
                .context(format!("Failed to hash {}", local.display()))?;
            Ok((size, sha256))
        })
        .await
        .context("SFTP upload task failed")??;

        Ok(UploadReceipt { url: self.url(&remote_file), size, sha256 })
    }
}
