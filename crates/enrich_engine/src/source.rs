use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use enrich_core::WorkItem;
use enrich_logging::{enrich_info, enrich_warn};
use thiserror::Error;

/// Header names of the two columns a work source must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceColumns {
    pub name: String,
    pub payload: String,
}

impl Default for SourceColumns {
    fn default() -> Self {
        Self {
            name: "software_name".to_string(),
            payload: "description".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot open work source {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed work source: {0}")]
    Csv(#[from] csv::Error),
    #[error("work source has no `{0}` column")]
    MissingColumn(String),
}

/// Read the whole work source at `path` before any processing starts.
pub fn load_work_items(path: &Path, columns: &SourceColumns) -> Result<Vec<WorkItem>, SourceError> {
    let file = File::open(path).map_err(|source| SourceError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let items = read_work_items(file, columns)?;
    enrich_info!("Loaded {} work items from {:?}", items.len(), path);
    Ok(items)
}

/// Parse CSV rows into work items, in file order.
///
/// Rows without a name are skipped; a repeated name keeps its first row.
pub fn read_work_items<R: Read>(
    reader: R,
    columns: &SourceColumns,
) -> Result<Vec<WorkItem>, SourceError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let name_idx = column_index(&headers, &columns.name)?;
    let payload_idx = column_index(&headers, &columns.payload)?;

    let mut seen = HashSet::new();
    let mut items = Vec::new();
    for (row, record) in csv_reader.records().enumerate() {
        let record = record?;
        // Row numbers are 1-based and the header is row 1.
        let line = row + 2;
        let name = record.get(name_idx).unwrap_or_default().trim();
        if name.is_empty() {
            enrich_warn!("Skipping work source row {} without a name", line);
            continue;
        }
        if !seen.insert(name.to_string()) {
            enrich_warn!("Skipping duplicate work item {:?} on row {}", name, line);
            continue;
        }
        let payload = record.get(payload_idx).unwrap_or_default();
        items.push(WorkItem::new(name, payload));
    }
    Ok(items)
}

fn column_index(headers: &csv::StringRecord, column: &str) -> Result<usize, SourceError> {
    headers
        .iter()
        .position(|header| header.trim_start_matches('\u{feff}').trim() == column)
        .ok_or_else(|| SourceError::MissingColumn(column.to_string()))
}
