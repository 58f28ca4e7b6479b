use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

/// `last_index` value before any item has succeeded.
pub const NO_INDEX: i64 = -1;

/// Durable record of which work items are settled.
///
/// `completed` and `failed` never share a name. A name only leaves `failed`
/// by succeeding; a completed name is never demoted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressState {
    completed: BTreeSet<String>,
    failed: BTreeSet<String>,
    last_index: i64,
    last_updated: Option<DateTime<Utc>>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            completed: BTreeSet::new(),
            failed: BTreeSet::new(),
            last_index: NO_INDEX,
            last_updated: None,
        }
    }
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a state from stored parts.
    ///
    /// Names listed as both completed and failed are kept as completed; they
    /// are returned so the caller can report the repair.
    pub fn restore<C, F>(
        completed: C,
        failed: F,
        last_index: i64,
        last_updated: Option<DateTime<Utc>>,
    ) -> (Self, Vec<String>)
    where
        C: IntoIterator<Item = String>,
        F: IntoIterator<Item = String>,
    {
        let completed: BTreeSet<String> = completed.into_iter().collect();
        let mut repaired = Vec::new();
        let failed = failed
            .into_iter()
            .filter(|name| {
                if completed.contains(name) {
                    repaired.push(name.clone());
                    false
                } else {
                    true
                }
            })
            .collect();
        let state = Self {
            completed,
            failed,
            last_index: last_index.max(NO_INDEX),
            last_updated,
        };
        (state, repaired)
    }

    pub fn completed(&self) -> &BTreeSet<String> {
        &self.completed
    }

    pub fn failed(&self) -> &BTreeSet<String> {
        &self.failed
    }

    pub fn last_index(&self) -> i64 {
        self.last_index
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn is_completed(&self, name: &str) -> bool {
        self.completed.contains(name)
    }

    pub fn is_failed(&self, name: &str) -> bool {
        self.failed.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty() && self.failed.is_empty()
    }

    pub fn is_disjoint(&self) -> bool {
        self.completed.is_disjoint(&self.failed)
    }

    /// Mark `name` as enriched and persisted; clears any earlier failure.
    pub fn record_success(&mut self, name: &str, source_index: usize) {
        self.failed.remove(name);
        self.completed.insert(name.to_string());
        self.last_index = i64::try_from(source_index).unwrap_or(i64::MAX);
    }

    /// Mark `name` as failed. Returns `false` (and changes nothing) when the
    /// name has already completed.
    pub fn record_failure(&mut self, name: &str) -> bool {
        if self.completed.contains(name) {
            return false;
        }
        self.failed.insert(name.to_string());
        true
    }

    /// Forget all failures so a retry pass can attempt them again.
    pub fn clear_failed(&mut self) {
        self.failed.clear();
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_updated = Some(at);
    }
}
