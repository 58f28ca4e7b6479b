use enrich_core::{ProgressState, ResumeDecision};

/// Answers "resume the previous run?" when a progress record exists.
pub trait ResumePolicy: Send + Sync {
    fn decide(&self, previous: &ProgressState) -> ResumeDecision;
}

/// Non-interactive default.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysResume;

impl ResumePolicy for AlwaysResume {
    fn decide(&self, _previous: &ProgressState) -> ResumeDecision {
        ResumeDecision::Resume
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysStartFresh;

impl ResumePolicy for AlwaysStartFresh {
    fn decide(&self, _previous: &ProgressState) -> ResumeDecision {
        ResumeDecision::StartFresh
    }
}
