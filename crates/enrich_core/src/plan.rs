use crate::{ProgressState, WorkItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Fresh or resumed pass over the full work source.
    #[default]
    Standard,
    /// Pass over previously exported failures; the failed set starts empty.
    Retry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeDecision {
    Resume,
    StartFresh,
}

/// Progress state to run with, after the resume decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub state: ProgressState,
    /// A previous record existed and was kept.
    pub resumed: bool,
    /// The state differs from what was loaded and must be saved before running.
    pub changed: bool,
}

/// Settle which progress state this run starts from.
///
/// `decide` is only consulted when a previous record exists. In retry mode the
/// failed set is cleared before deciding.
pub fn reconcile<D>(previous: Option<ProgressState>, mode: RunMode, decide: D) -> Reconciled
where
    D: FnOnce(&ProgressState) -> ResumeDecision,
{
    let Some(loaded) = previous else {
        return Reconciled {
            state: ProgressState::new(),
            resumed: false,
            changed: false,
        };
    };

    let mut state = loaded.clone();
    if mode == RunMode::Retry {
        state.clear_failed();
    }

    let resumed = match decide(&state) {
        ResumeDecision::Resume => true,
        ResumeDecision::StartFresh => {
            state = ProgressState::new();
            false
        }
    };

    let changed = state != loaded;
    Reconciled {
        state,
        resumed,
        changed,
    }
}

/// Work queue for one run, as indices into the work source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunPlan {
    pub queue: Vec<usize>,
    pub skipped_completed: Vec<String>,
    pub skipped_failed: Vec<String>,
}

impl RunPlan {
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Keep work-source order; skip anything already completed or failed.
pub fn plan_queue(items: &[WorkItem], state: &ProgressState) -> RunPlan {
    let mut plan = RunPlan::default();
    for (index, item) in items.iter().enumerate() {
        if state.is_completed(&item.name) {
            plan.skipped_completed.push(item.name.clone());
        } else if state.is_failed(&item.name) {
            plan.skipped_failed.push(item.name.clone());
        } else {
            plan.queue.push(index);
        }
    }
    plan
}
