//! Security utilities for log output.
//!
//! Upload errors bubble up from rusoto and ssh2 and may echo credentials,
//! presigned URLs or key file paths. Everything logged by the collector
//! about a failed upload goes through [`safe_error_message`] first.

pub mod credential_scrubber;

pub use credential_scrubber::{safe_error_message, scrub_credentials, scrub_path};
