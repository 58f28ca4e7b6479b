use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use enrich_core::WorkItem;
use enrich_logging::enrich_info;
use thiserror::Error;

use crate::atomic::{write_atomic, WriteError};
use crate::source::SourceColumns;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("write error: {0}")]
    Write(#[from] WriteError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub count: usize,
}

/// Overwrite `path` with the work items whose name is in `failed`, in
/// work-source order and work-source shape, so the file can be fed back in
/// as a work source. No failures yields a header-only file.
pub fn export_failed_items(
    path: &Path,
    items: &[WorkItem],
    failed: &BTreeSet<String>,
    columns: &SourceColumns,
) -> Result<ExportSummary, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([columns.name.as_str(), columns.payload.as_str()])?;

    let mut count = 0;
    for item in items.iter().filter(|item| failed.contains(&item.name)) {
        writer.write_record([item.name.as_str(), item.payload.as_str()])?;
        count += 1;
    }

    let buffer = writer
        .into_inner()
        .map_err(|err| ExportError::Io(err.into_error()))?;
    write_atomic(path, &buffer)?;

    enrich_info!("Exported {} failed items to {:?}", count, path);
    Ok(ExportSummary {
        path: path.to_path_buf(),
        count,
    })
}
