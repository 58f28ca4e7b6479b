//! Enrichment core: pure progress bookkeeping and the batch run state machine.
mod item;
mod outcome;
mod phase;
mod plan;
mod progress;
mod run;
mod summary;

pub use item::WorkItem;
pub use outcome::{ItemFailure, ItemOutcome, ItemStage};
pub use phase::{PhaseError, RunPhase};
pub use plan::{plan_queue, reconcile, Reconciled, ResumeDecision, RunMode, RunPlan};
pub use progress::{ProgressState, NO_INDEX};
pub use run::BatchRun;
pub use summary::RunSummary;
