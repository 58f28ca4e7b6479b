use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("directory missing or not writable: {0}")]
    Directory(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure `dir` exists and accepts new files; create it if missing.
pub fn ensure_dir(dir: &Path) -> Result<(), WriteError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| WriteError::Directory(e.to_string()))?;
        if !meta.is_dir() {
            return Err(WriteError::Directory(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| WriteError::Directory(e.to_string()))?;
    }
    // Writability probe: the temp file is removed on drop.
    NamedTempFile::new_in(dir).map_err(|e| WriteError::Directory(e.to_string()))?;
    Ok(())
}

/// Directory a bare file name like `progress.json` lives in.
pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Replace `target` with `content` via a synced temp file in the same directory
/// and a rename, so readers see either the old or the new file, never a torn one.
pub fn write_atomic(target: &Path, content: &[u8]) -> Result<(), WriteError> {
    let dir = parent_dir(target);
    if !dir.is_dir() {
        ensure_dir(dir)?;
    }

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(target).map_err(|e| WriteError::Io(e.error))?;
    Ok(())
}

/// Writes whole files into one directory, atomically.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, WriteError> {
        ensure_dir(&self.dir)?;
        let target = self.dir.join(filename);
        write_atomic(&target, content.as_bytes())?;
        Ok(target)
    }
}
