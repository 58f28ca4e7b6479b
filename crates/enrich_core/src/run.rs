use crate::{ItemOutcome, PhaseError, ProgressState, RunPhase, RunSummary, WorkItem};

/// Mutable state of one batch run: phase, progress and this run's tallies.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchRun {
    phase: RunPhase,
    progress: ProgressState,
    attempted: usize,
    succeeded: usize,
    failed: usize,
}

impl BatchRun {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn progress(&self) -> &ProgressState {
        &self.progress
    }

    pub fn progress_mut(&mut self) -> &mut ProgressState {
        &mut self.progress
    }

    pub fn set_progress(&mut self, progress: ProgressState) {
        self.progress = progress;
    }

    pub fn advance(&mut self, next: RunPhase) -> Result<RunPhase, PhaseError> {
        if !self.phase.can_advance_to(next) {
            return Err(PhaseError {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        Ok(next)
    }

    /// Fold one item's outcome into progress. Only valid while running.
    pub fn record(&mut self, outcome: &ItemOutcome) -> Result<(), PhaseError> {
        if self.phase != RunPhase::Running {
            return Err(PhaseError {
                from: self.phase,
                to: RunPhase::Running,
            });
        }
        self.attempted += 1;
        match outcome {
            ItemOutcome::Completed { source_index, name } => {
                self.progress.record_success(name, *source_index);
                self.succeeded += 1;
            }
            ItemOutcome::Failed { failure, .. } => {
                self.progress.record_failure(failure.name());
                self.failed += 1;
            }
        }
        Ok(())
    }

    /// Put names an interrupted retry never reached back into the failed set,
    /// so the next retry still sees them. Returns how many were put back.
    pub fn restore_unattempted<'a, I>(&mut self, names: I) -> Result<usize, PhaseError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if self.phase != RunPhase::Interrupted {
            return Err(PhaseError {
                from: self.phase,
                to: RunPhase::Interrupted,
            });
        }
        Ok(names
            .into_iter()
            .filter(|name| self.progress.record_failure(name))
            .count())
    }

    pub fn attempted(&self) -> usize {
        self.attempted
    }

    pub fn summary(&self, items: &[WorkItem]) -> RunSummary {
        let completed = items
            .iter()
            .filter(|item| self.progress.is_completed(&item.name))
            .count();
        let failed = items
            .iter()
            .filter(|item| self.progress.is_failed(&item.name))
            .count();
        RunSummary {
            total: items.len(),
            completed,
            failed,
            attempted: self.attempted,
            succeeded: self.succeeded,
            failed_this_run: self.failed,
            interrupted: self.phase == RunPhase::Interrupted,
            last_index: self.progress.last_index(),
        }
    }
}
