use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use enrich_core::{ProgressState, NO_INDEX};
use enrich_logging::{enrich_debug, enrich_info, enrich_warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::atomic::{ensure_dir, parent_dir, write_atomic, WriteError};

#[derive(Debug, Error)]
pub enum ProgressStoreError {
    #[error("cannot read progress record {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("progress record {path} is corrupt: {message}")]
    Corrupt { path: PathBuf, message: String },
    #[error("cannot serialize progress record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("cannot write progress record: {0}")]
    Write(#[from] WriteError),
}

/// On-disk shape of the progress record.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedProgress {
    completed: Vec<String>,
    failed: Vec<String>,
    #[serde(default = "no_index")]
    last_index: i64,
    #[serde(default)]
    timestamp: Option<String>,
}

fn no_index() -> i64 {
    NO_INDEX
}

/// JSON progress record, overwritten wholesale on every save.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fail early when the record's directory cannot take writes.
    pub fn ensure_writable(&self) -> Result<(), ProgressStoreError> {
        ensure_dir(parent_dir(&self.path))?;
        Ok(())
    }

    /// `Ok(None)` when no record exists. A record that exists but does not
    /// parse is an error, never a silent reset.
    pub fn load(&self) -> Result<Option<ProgressState>, ProgressStoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ProgressStoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let persisted: PersistedProgress =
            serde_json::from_str(&content).map_err(|err| ProgressStoreError::Corrupt {
                path: self.path.clone(),
                message: err.to_string(),
            })?;

        let last_updated = persisted.timestamp.as_deref().and_then(|raw| {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                enrich_warn!("Ignoring unreadable progress timestamp {:?}", raw);
            }
            parsed
        });

        let (state, repaired) = ProgressState::restore(
            persisted.completed,
            persisted.failed,
            persisted.last_index,
            last_updated,
        );
        for name in &repaired {
            enrich_warn!("{:?} was both completed and failed; keeping it completed", name);
        }

        enrich_info!(
            "Loaded progress from {:?}: {} completed, {} failed",
            self.path,
            state.completed().len(),
            state.failed().len()
        );
        Ok(Some(state))
    }

    /// Stamp `state` with the current time and overwrite the record.
    pub fn save(&self, state: &mut ProgressState) -> Result<(), ProgressStoreError> {
        self.save_at(state, Utc::now())
    }

    pub fn save_at(
        &self,
        state: &mut ProgressState,
        at: DateTime<Utc>,
    ) -> Result<(), ProgressStoreError> {
        state.touch(at);
        let persisted = PersistedProgress {
            completed: state.completed().iter().cloned().collect(),
            failed: state.failed().iter().cloned().collect(),
            last_index: state.last_index(),
            timestamp: Some(at.to_rfc3339_opts(SecondsFormat::Micros, true)),
        };
        let content = serde_json::to_string_pretty(&persisted)?;
        write_atomic(&self.path, content.as_bytes())?;
        enrich_debug!(
            "Saved progress to {:?} ({} completed, {} failed)",
            self.path,
            state.completed().len(),
            state.failed().len()
        );
        Ok(())
    }
}

/// RFC 3339, or a naive ISO-8601 local time taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
