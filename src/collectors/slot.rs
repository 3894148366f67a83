use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::OnceLock;

use crate::models::TaskStage;

/// Write-once result cell owned by one collection task.
///
/// The task advances the stage as it goes and records its outcome exactly
/// once before finishing. The orchestrator only reads the stage and outcome,
/// and marks the slot abandoned when it stops waiting. A read racing a late
/// write sees either the old or the new value, never a torn one.
#[derive(Debug, Default)]
pub struct OutcomeSlot {
    stage: AtomicU8,
    outcome: OnceLock<bool>,
    abandoned: AtomicBool,
}

impl OutcomeSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to a non-terminal stage. Ignored once the outcome is recorded.
    pub fn advance(&self, stage: TaskStage) {
        if stage.is_terminal() || self.outcome.get().is_some() {
            return;
        }
        self.stage.store(stage as u8, Ordering::Release);
    }

    /// Record the outcome. Returns `false` if one was already recorded,
    /// in which case nothing changes.
    pub fn complete(&self, succeeded: bool) -> bool {
        if self.outcome.set(succeeded).is_err() {
            return false;
        }
        let stage = if succeeded { TaskStage::Succeeded } else { TaskStage::Failed };
        self.stage.store(stage as u8, Ordering::Release);
        true
    }

    pub fn stage(&self) -> TaskStage {
        TaskStage::from_u8(self.stage.load(Ordering::Acquire))
    }

    /// `None` while the task is still running
    pub fn outcome(&self) -> Option<bool> {
        self.outcome.get().copied()
    }

    pub fn is_successful(&self) -> bool {
        self.outcome() == Some(true)
    }

    /// Nobody is waiting for this task any more; it must finish silently.
    pub fn abandon(&self) {
        self.abandoned.store(true, Ordering::SeqCst);
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::SeqCst)
    }
}
