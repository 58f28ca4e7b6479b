use std::fs;

use chrono::{TimeZone, Utc};
use enrich_core::{ProgressState, NO_INDEX};
use enrich_engine::{ProgressStore, ProgressStoreError};
use serde_json::Value;
use tempfile::TempDir;

fn init_logging() {
    enrich_logging::initialize_for_tests();
}

#[test]
fn missing_record_loads_as_none() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let store = ProgressStore::new(temp.path().join("progress.json"));
    assert!(store.load().unwrap().is_none());
}

#[test]
fn save_then_load_keeps_sets_index_and_timestamp() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let store = ProgressStore::new(temp.path().join("progress.json"));

    let mut state = ProgressState::new();
    state.record_success("Workday", 4);
    state.record_failure("Slack");
    let at = Utc.with_ymd_and_hms(2025, 10, 3, 14, 22, 1).unwrap();
    store.save_at(&mut state, at).unwrap();
    assert_eq!(state.last_updated(), Some(at));

    let loaded = store.load().unwrap().unwrap();
    assert_eq!(loaded, state);
}

#[test]
fn record_uses_the_documented_field_names() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("progress.json");
    let store = ProgressStore::new(&path);

    let mut state = ProgressState::new();
    state.record_failure("Slack");
    store.save(&mut state).unwrap();

    let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["completed"], serde_json::json!([]));
    assert_eq!(raw["failed"], serde_json::json!(["Slack"]));
    assert_eq!(raw["last_index"], NO_INDEX);
    assert!(raw["timestamp"].is_string());
}

#[test]
fn every_save_moves_the_timestamp() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let store = ProgressStore::new(temp.path().join("progress.json"));
    let mut state = ProgressState::new();

    let first = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let second = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 5).unwrap();
    store.save_at(&mut state, first).unwrap();
    store.save_at(&mut state, second).unwrap();
    assert_eq!(store.load().unwrap().unwrap().last_updated(), Some(second));
}

#[test]
fn reads_records_written_by_earlier_tooling() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("progress.json");
    fs::write(
        &path,
        r#"{
  "completed": ["Workday", "Slack"],
  "failed": ["Slack", "Zoom"],
  "last_index": 12,
  "timestamp": "2025-10-03T14:22:01.123456"
}"#,
    )
    .unwrap();

    let state = ProgressStore::new(&path).load().unwrap().unwrap();
    assert!(state.is_completed("Slack"));
    assert!(!state.is_failed("Slack"));
    assert!(state.is_failed("Zoom"));
    assert_eq!(state.last_index(), 12);
    assert!(state.last_updated().is_some());
}

#[test]
fn corrupt_record_is_an_error_not_a_reset() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("progress.json");
    fs::write(&path, "{\"completed\": [").unwrap();

    let err = ProgressStore::new(&path).load().unwrap_err();
    assert!(matches!(err, ProgressStoreError::Corrupt { .. }));
    assert_eq!(fs::read_to_string(&path).unwrap(), "{\"completed\": [");
}

#[test]
fn record_without_progress_fields_is_corrupt() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("progress.json");

    for foreign in [r#"{"name": "some other json file"}"#, "{}", r#"{"completed": []}"#] {
        fs::write(&path, foreign).unwrap();
        let err = ProgressStore::new(&path).load().unwrap_err();
        assert!(
            matches!(err, ProgressStoreError::Corrupt { .. }),
            "{foreign} loaded as {err:?}"
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), foreign);
    }
}

#[test]
fn unwritable_location_is_detected_up_front() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("blocker");
    fs::write(&blocker, "x").unwrap();

    let store = ProgressStore::new(blocker.join("progress.json"));
    assert!(store.ensure_writable().is_err());
}
