use std::fmt;

/// Where a single item stands in its enrich-then-persist flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStage {
    Pending,
    Enriched,
    Persisted,
    Complete,
    Failed,
}

/// Why one item did not complete. Never fatal to the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemFailure {
    EnrichmentFailed { name: String, cause: String },
    PersistenceFailed { name: String, cause: String },
}

impl ItemFailure {
    pub fn name(&self) -> &str {
        match self {
            ItemFailure::EnrichmentFailed { name, .. }
            | ItemFailure::PersistenceFailed { name, .. } => name,
        }
    }

    /// Last stage the item reached before failing.
    pub fn stage_reached(&self) -> ItemStage {
        match self {
            ItemFailure::EnrichmentFailed { .. } => ItemStage::Pending,
            ItemFailure::PersistenceFailed { .. } => ItemStage::Enriched,
        }
    }
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemFailure::EnrichmentFailed { name, cause } => {
                write!(f, "failed to enrich {name}: {cause}")
            }
            ItemFailure::PersistenceFailed { name, cause } => {
                write!(f, "failed to save {name}: {cause}")
            }
        }
    }
}

/// Final result of one item, as recorded in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Completed { source_index: usize, name: String },
    Failed { source_index: usize, failure: ItemFailure },
}

impl ItemOutcome {
    pub fn completed(source_index: usize, name: impl Into<String>) -> Self {
        ItemOutcome::Completed {
            source_index,
            name: name.into(),
        }
    }

    pub fn enrichment_failed(
        source_index: usize,
        name: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        ItemOutcome::Failed {
            source_index,
            failure: ItemFailure::EnrichmentFailed {
                name: name.into(),
                cause: cause.into(),
            },
        }
    }

    pub fn persistence_failed(
        source_index: usize,
        name: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        ItemOutcome::Failed {
            source_index,
            failure: ItemFailure::PersistenceFailed {
                name: name.into(),
                cause: cause.into(),
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ItemOutcome::Completed { name, .. } => name,
            ItemOutcome::Failed { failure, .. } => failure.name(),
        }
    }

    pub fn stage(&self) -> ItemStage {
        match self {
            ItemOutcome::Completed { .. } => ItemStage::Complete,
            ItemOutcome::Failed { .. } => ItemStage::Failed,
        }
    }
}
