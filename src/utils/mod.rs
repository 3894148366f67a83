//! Utility functions shared by the uploaders and the orchestrator.
//!
//! ## Components
//!
//! - **Hashing**: SHA-256 of uploaded files, reported in upload receipts
//! - **Logging**: terminal logger setup for embedding applications

/// Cryptographic hash calculation utilities
pub mod hash;

/// Logger initialization
pub mod logging;
