//! Concurrent collection of debug artifacts.
//!
//! ```text
//!                    ┌──────────────────┐
//!                    │  DebugCollector  │
//!                    └────────┬─────────┘
//!          ┌──────────────────┼──────────────────┐
//!   ┌──────▼──────┐    ┌──────▼──────┐    ┌──────▼──────┐
//!   │  topology   │    │   profile   │    │ track files │
//!   │    task     │    │    task     │    │    task     │
//!   └──────┬──────┘    └──────┬──────┘    └──────┬──────┘
//!          │ OutcomeSlot      │ OutcomeSlot      │ OutcomeSlot
//!          └──────────── join ┼ ─────────────────┘
//!                        select! vs deadline
//! ```
//!
//! Each task owns one write-once [`slot::OutcomeSlot`]. The orchestrator
//! joins the three task handles and races the join against the deadline.
//! Whatever the slots hold when the race ends is the reported outcome.

/// Orchestrator racing the three tasks against the deadline
pub mod orchestrator;

/// Write-once per-task outcome cell
pub mod slot;

/// Single artifact collect, write and upload unit
pub mod task;

pub use orchestrator::{collect_and_upload, DebugCollector};
pub use slot::OutcomeSlot;
pub use task::{select_track_files, ArtifactProducer, CollectionTask};
