//! File store, settings, and props integration tests against a temp home.
//! Layout: ~/.duesync/{settings.yaml, props.json, sheets/<name>.yaml}

use assert_fs::prelude::*;
use duesync_core::{
    header_row, ingest, props, FileRecordStore, RecordStore, Settings, SettingsError, StoreError,
};
use predicates::prelude::predicate;
use std::fs;

fn portal(title: &str, end: &str) -> ingest::PortalAssignment {
    ingest::PortalAssignment {
        course: "101 Algebra (Spring)".to_string(),
        title: title.to_string(),
        start: String::new(),
        end: end.to_string(),
        link: format!("https://portal.test/{title}"),
    }
}

// ---------------------------------------------------------------------------
// 1. Sheet files
// ---------------------------------------------------------------------------

#[test]
fn sheet_file_is_created_under_duesync_root() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let mut store = FileRecordStore::at(home.path());
    store.ensure_sheet("WebClass").expect("ensure");

    home.child(".duesync/sheets/WebClass.yaml")
        .assert(predicate::path::exists());
    home.child(".duesync/sheets/WebClass.yaml")
        .assert(predicate::str::contains("source"));
}

#[cfg(unix)]
#[test]
fn sheet_file_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let home = assert_fs::TempDir::new().expect("tempdir");
    let mut store = FileRecordStore::at(home.path());
    store.write_rows("S", &[header_row()]).expect("write");
    let mode = fs::metadata(store.sheet_path("S")).expect("meta").permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn corrupt_sheet_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".duesync/sheets/WebClass.yaml")
        .write_str(": : corrupt [unclosed")
        .expect("write");

    let store = FileRecordStore::at(home.path());
    let err = store.read_rows("WebClass").unwrap_err();
    assert!(matches!(err, StoreError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("WebClass.yaml"));
}

#[test]
fn delete_from_missing_sheet_is_not_found() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let mut store = FileRecordStore::at(home.path());
    let err = store.delete_row("Nope", 1).unwrap_err();
    assert!(matches!(err, StoreError::SheetNotFound(ref s) if s == "Nope"));
}

// ---------------------------------------------------------------------------
// 2. Ingestion into a file store
// ---------------------------------------------------------------------------

#[test]
fn ingest_twice_does_not_duplicate_rows() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let mut store = FileRecordStore::at(home.path());

    let batch: Vec<_> = [portal("HW1", "2024/05/01"), portal("HW2", "2024/05/08")]
        .iter()
        .map(ingest::portal_row)
        .collect();

    for _ in 0..2 {
        let existing = store.read_rows("WebClass").expect("read").unwrap_or_default();
        let (rows, _) = ingest::merge_rows(existing, &batch);
        store.write_rows("WebClass", &rows).expect("write");
    }

    let rows = store.read_rows("WebClass").expect("read").expect("exists");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1][1], "Algebra");
}

// ---------------------------------------------------------------------------
// 3. Settings and props
// ---------------------------------------------------------------------------

#[test]
fn settings_file_overrides_defaults() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".duesync/settings.yaml")
        .write_str("CLEANUP_DAYS: 7\nTASKS_LIST_NAME: Homework\n")
        .expect("write");

    let settings = Settings::load_at(home.path()).expect("load");
    assert_eq!(settings.cleanup_days, 7);
    assert_eq!(settings.tasks_list_name, "Homework");
    assert_eq!(settings.trigger_hour, 6);
}

#[test]
fn settings_wrong_shape_is_parse_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".duesync/settings.yaml")
        .write_str("- a list\n- not a mapping\n")
        .expect("write");

    let err = Settings::load_at(home.path()).unwrap_err();
    assert!(matches!(err, SettingsError::Parse { .. }), "got: {err}");
}

#[test]
fn props_survive_reload() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let now = chrono::Utc::now();
    props::update_at(home.path(), |p| {
        p.task_list_id = Some("L1".to_string());
        p.last_run_at = Some(now);
    })
    .expect("update");

    home.child(".duesync/props.json")
        .assert(predicate::str::contains("\"task_list_id\": \"L1\""));
    let loaded = props::load_at(home.path()).expect("load");
    assert_eq!(loaded.last_run_at, Some(now));
}
