//! Global constants for the debug collector.
//!
//! This module centralizes all hardcoded values to improve maintainability
//! and make configuration changes easier.

use std::time::Duration;

// Orchestration
/// Default deadline shared by the three collection tasks (3 seconds)
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(3);

/// Default suffix used to pick per-track debug files out of the temp directory
pub const DEFAULT_TRACK_FILE_SUFFIX: &str = ".csv";

/// Extension of the local pipeline topology dump
pub const TOPOLOGY_EXTENSION: &str = ".dot";

/// Extension of the local profile snapshot
pub const PROFILE_EXTENSION: &str = ".prof";

// Cloud storage constants
/// Default per-request I/O timeout in seconds
pub const DEFAULT_IO_TIMEOUT_SECS: u64 = 30;

/// Maximum upload retry attempts
pub const MAX_UPLOAD_RETRIES: usize = 3;

/// Base retry delay in milliseconds
pub const RETRY_BASE_DELAY_MS: u64 = 250;

/// Default SFTP port
pub const SFTP_DEFAULT_PORT: u16 = 22;

/// Buffer size for hashing and SFTP writes (1MB)
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

// Error messages
pub const ERROR_FAILED_TO_CREATE_SESSION: &str = "Failed to create SSH session";
pub const ERROR_FAILED_TO_CREATE_SFTP: &str = "Failed to create SFTP subsystem";
pub const ERROR_AUTHENTICATION_FAILED: &str = "Authentication failed";

// Content types
pub const CONTENT_TYPE_BLOB: &str = "application/octet-stream";
pub const CONTENT_TYPE_GRAPHVIZ: &str = "text/vnd.graphviz";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_CSV: &str = "text/csv";
