//! Producers of the byte-based debug artifacts.
//!
//! - [`topology`]: textual dump of the media pipeline graph (Graphviz DOT)
//! - [`profile`]: snapshot of the runtime and process execution state
//!
//! Per-track files are not produced here: they already sit in the session
//! temp directory and are picked up by the track-file collection task.

/// Pipeline topology dumps
pub mod topology;

/// Runtime profile snapshots
pub mod profile;

pub use profile::{ProfileKind, ProfileSource, RuntimeProfiler};
pub use topology::{ElementState, PipelineElement, PipelineGraph, PipelineLink, TopologySource};
