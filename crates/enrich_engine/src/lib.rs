//! Enrichment engine: work source IO, progress checkpoints, pacing and the batch controller.
mod atomic;
mod controller;
mod enrich;
mod events;
mod export;
mod filename;
mod pacing;
mod progress_store;
mod resume;
mod sink;
mod source;

pub use atomic::{ensure_dir, write_atomic, AtomicFileWriter, WriteError};
pub use controller::{BatchController, BatchError, ControllerSettings, RunReport};
pub use enrich::{
    parse_record, AnthropicEnricher, EnrichError, EnrichFailureKind, EnrichSettings,
    EnrichedRecord, Enricher, PromptTemplate,
};
pub use events::{BatchEvent, EventSink, NoopEventSink};
pub use export::{export_failed_items, ExportError, ExportSummary};
pub use filename::record_filename;
pub use pacing::{PacingSettings, Permit, RateLimiter};
pub use progress_store::{ProgressStore, ProgressStoreError};
pub use resume::{AlwaysResume, AlwaysStartFresh, ResumePolicy};
pub use sink::{Clock, JsonDirectorySink, PersistError, RecordSink};
pub use source::{load_work_items, read_work_items, SourceColumns, SourceError};
