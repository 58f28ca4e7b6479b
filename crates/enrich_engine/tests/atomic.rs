use std::fs;

use enrich_engine::{ensure_dir, write_atomic, AtomicFileWriter};
use tempfile::TempDir;

#[test]
fn creates_missing_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out").join("nested");
    assert!(!new_dir.exists());
    ensure_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn writer_replaces_existing_file() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("record.json", "{}").unwrap();
    assert_eq!(first.file_name().unwrap(), "record.json");
    assert_eq!(fs::read_to_string(&first).unwrap(), "{}");

    let second = writer.write("record.json", "{\"a\":1}").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "{\"a\":1}");
}

#[test]
fn overwrite_leaves_no_temp_files_behind() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("progress.json");
    for round in 0..5 {
        write_atomic(&target, format!("round {round}").as_bytes()).unwrap();
    }
    assert_eq!(fs::read_to_string(&target).unwrap(), "round 4");
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[test]
fn no_partial_file_when_dir_is_a_file() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("record.json", "data").is_err());
    assert!(!file_path.with_file_name("record.json").exists());
    assert_eq!(fs::read_to_string(&file_path).unwrap(), "x");
}
