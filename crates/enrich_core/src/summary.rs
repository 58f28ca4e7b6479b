/// End-of-run tallies, returned by value instead of kept as shared counters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Items in the work source.
    pub total: usize,
    /// Work-source items the progress record lists as completed, by any run.
    pub completed: usize,
    /// Work-source items the progress record lists as failed, by any run.
    pub failed: usize,
    /// Items attempted by this run.
    pub attempted: usize,
    pub succeeded: usize,
    pub failed_this_run: usize,
    pub interrupted: bool,
    pub last_index: i64,
}

impl RunSummary {
    /// Completed items as a percentage of the work source.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }
}
