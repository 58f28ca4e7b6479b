use std::path::PathBuf;
use std::time::Duration;

use enrich_core::{ItemOutcome, ItemStage, RunPhase, RunSummary};

/// User-visible progress of a batch run.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    PhaseChanged(RunPhase),
    /// A previous progress record was found.
    PreviousProgress { completed: usize, failed: usize },
    Planned {
        total: usize,
        to_process: usize,
        skipped_completed: usize,
        skipped_failed: usize,
    },
    SkippedFailed { name: String },
    ItemStarted {
        /// 1-based position in this run's queue.
        position: usize,
        of: usize,
        source_index: usize,
        name: String,
    },
    ItemStage { name: String, stage: ItemStage },
    ItemFinished {
        position: usize,
        of: usize,
        outcome: ItemOutcome,
    },
    Checkpoint { processed: usize, cooldown: Duration },
    Interrupted { processed: usize },
    Exported { path: PathBuf, count: usize },
    ExportFailed { message: String },
    Finished(RunSummary),
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: BatchEvent);
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: BatchEvent) {}
}
