use std::fmt;

/// Lifecycle of one batch run.
///
/// `Init -> Reconciling -> Running -> Draining -> Done`, with a shortcut from
/// `Reconciling` straight to `Done` for an empty queue and an absorbing
/// `Interrupted` reachable from `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Init,
    Reconciling,
    Running,
    Draining,
    Done,
    Interrupted,
}

impl RunPhase {
    pub fn can_advance_to(self, next: RunPhase) -> bool {
        matches!(
            (self, next),
            (RunPhase::Init, RunPhase::Reconciling)
                | (RunPhase::Reconciling, RunPhase::Running)
                | (RunPhase::Reconciling, RunPhase::Done)
                | (RunPhase::Running, RunPhase::Draining)
                | (RunPhase::Running, RunPhase::Interrupted)
                | (RunPhase::Draining, RunPhase::Done)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Done | RunPhase::Interrupted)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunPhase::Init => "init",
            RunPhase::Reconciling => "reconciling",
            RunPhase::Running => "running",
            RunPhase::Draining => "draining",
            RunPhase::Done => "done",
            RunPhase::Interrupted => "interrupted",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseError {
    pub from: RunPhase,
    pub to: RunPhase,
}

impl fmt::Display for PhaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal run phase transition {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for PhaseError {}
