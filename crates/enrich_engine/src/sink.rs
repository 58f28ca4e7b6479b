use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use enrich_core::WorkItem;
use enrich_logging::enrich_debug;
use serde_json::json;
use thiserror::Error;

use crate::atomic::{AtomicFileWriter, WriteError};
use crate::enrich::EnrichedRecord;
use crate::filename::record_filename;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("cannot serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("cannot write record: {0}")]
    Write(#[from] WriteError),
    #[error("record rejected: {0}")]
    Rejected(String),
}

/// Durably stores an enriched record, or fails.
#[async_trait::async_trait]
pub trait RecordSink: Send + Sync {
    async fn persist(&self, item: &WorkItem, record: &EnrichedRecord) -> Result<(), PersistError>;
}

/// Produces the `persisted_utc` stamp for each record.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

/// One pretty-printed JSON document per item, named after the item.
/// Persisting the same item again replaces its document.
pub struct JsonDirectorySink {
    writer: AtomicFileWriter,
    clock: Clock,
}

impl JsonDirectorySink {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
            clock: Arc::new(|| Utc::now().to_rfc3339()),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn dir(&self) -> &Path {
        self.writer.dir()
    }

    pub fn document_path(&self, item: &WorkItem) -> PathBuf {
        self.writer.dir().join(record_filename(&item.name))
    }
}

#[async_trait::async_trait]
impl RecordSink for JsonDirectorySink {
    async fn persist(&self, item: &WorkItem, record: &EnrichedRecord) -> Result<(), PersistError> {
        let document = json!({
            "name": item.name,
            "payload": item.payload,
            "record": record.0,
            "persisted_utc": (self.clock)(),
        });
        let content = serde_json::to_string_pretty(&document)?;
        let path = self.writer.write(&record_filename(&item.name), &content)?;
        enrich_debug!("Persisted {:?} to {:?}", item.name, path);
        Ok(())
    }
}
