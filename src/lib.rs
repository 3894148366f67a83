//! # debug-collector
//!
//! Bounded-time, best-effort collection of pipeline debug artifacts.
//!
//! ## Overview
//!
//! When a media/egress pipeline session needs debugging, three artifacts are
//! gathered and shipped to remote storage:
//!
//! - the pipeline topology as Graphviz DOT text
//! - a runtime profile snapshot
//! - the per-track diagnostic files already written to the session temp dir
//!
//! Each artifact is collected and uploaded by its own tokio task. The three
//! tasks are joined and the join is raced against a single deadline, so
//! collecting diagnostics never holds up shutdown. Failures are logged and
//! never returned.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use debug_collector::collectors::DebugCollector;
//! use debug_collector::config::{DebugConfig, StorageConfig};
//! use debug_collector::models::SessionId;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = DebugConfig::new(StorageConfig::Local {
//!     directory: "/var/tmp/debug-uploads".into(),
//! });
//! let session_id = SessionId::new("EG_4f2c")?;
//!
//! let collector = DebugCollector::new(
//!     session_id,
//!     Path::new("/tmp/EG_4f2c"),
//!     config,
//!     Arc::new(|| "digraph pipeline {}".to_string()),
//! );
//!
//! let summary = collector.upload_debug_files().await;
//! println!("{:?}: missing {:?}", summary.state, summary.missing);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`models`]: Artifact kinds, outcomes, session ids and run summaries
//! - [`collectors`]: Collection tasks and the deadline-bounded orchestrator
//! - [`sources`]: Topology and profile producers
//! - [`cloud`]: Upload backends (S3, SFTP, local directory)
//! - [`config`]: YAML configuration and environment variable expansion
//! - [`errors`]: Failure taxonomy used in log output
//! - [`security`]: Credential scrubbing for log lines
//! - [`utils`]: Hashing and logger setup
//! - [`constants`]: Defaults and fixed values

/// Core data models shared by tasks, uploaders and the orchestrator
pub mod models;

/// Collection tasks and the orchestrator
pub mod collectors;

/// Producers of the topology and profile artifacts
pub mod sources;

/// Utility functions for hashing and logging
pub mod utils;

/// Remote storage integration (S3, SFTP, local)
pub mod cloud;

/// Configuration loading and validation
pub mod config;

/// Error types for collection failures
pub mod errors;

/// Application constants and configuration values
pub mod constants;

/// Security utilities for credential protection
pub mod security;
