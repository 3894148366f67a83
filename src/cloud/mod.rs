//! Remote storage backends for debug artifacts.
//!
//! Every backend implements [`uploader::ArtifactUploader`] and is built from a
//! [`crate::config::StorageConfig`] through [`uploader::build_uploader`].
//!
//! ## Supported Backends
//!
//! - **Amazon S3**: S3 and S3-compatible stores via rusoto
//! - **SFTP**: any SSH/SFTP server via ssh2
//! - **Local**: a directory mirroring the remote key layout
//!
//! Remote keys are always `{session_id}/{filename}`, so re-running a
//! collection for the same session overwrites instead of piling up copies.

/// Uploader trait and construction from configuration
pub mod uploader;

/// Amazon S3 integration
pub mod s3;

/// SFTP integration
pub mod sftp;

/// Local directory backend
pub mod local;

pub use uploader::{build_uploader, ArtifactUploader};
