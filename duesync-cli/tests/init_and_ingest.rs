use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;

use duesync_core::{header_row, paths, FileRecordStore, RecordStore};
use tempfile::TempDir;

fn duesync_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("duesync"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("GOOGLE_TASKS_ACCESS_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn init_scaffolds_settings_and_header_only_sheets() {
    let home = TempDir::new().expect("home");

    duesync_cmd(home.path())
        .arg("init")
        .assert()
        .success()
        .stdout(contains("Created sheet 'WebClass'"))
        .stdout(contains("Created sheet 'Classroom'"));

    assert!(paths::settings_path(home.path()).exists());
    let store = FileRecordStore::at(home.path());
    for sheet in ["WebClass", "Classroom"] {
        assert_eq!(store.read_rows(sheet).unwrap(), Some(vec![header_row()]));
    }
}

#[test]
fn init_keeps_user_settings() {
    let home = TempDir::new().expect("home");
    let settings = paths::settings_path(home.path());
    fs::create_dir_all(settings.parent().unwrap()).unwrap();
    fs::write(&settings, "CLEANUP_DAYS: 7\nSHEETS: [Portal]\n").unwrap();

    duesync_cmd(home.path())
        .arg("init")
        .assert()
        .success()
        .stdout(contains("Kept existing"))
        .stdout(contains("Created sheet 'Portal'"));

    assert_eq!(
        fs::read_to_string(&settings).unwrap(),
        "CLEANUP_DAYS: 7\nSHEETS: [Portal]\n"
    );
}

#[test]
fn portal_ingest_twice_updates_instead_of_duplicating() {
    let home = TempDir::new().expect("home");
    let batch = home.path().join("portal.json");
    fs::write(
        &batch,
        r#"[{"course": "10234 Linear Algebra (2024 Spring)", "title": "Report 1",
             "start": "2024/04/01 09:00", "end": "2024/05/01 17:00", "link": "https://portal.test/1"}]"#,
    )
    .unwrap();

    duesync_cmd(home.path())
        .args(["ingest", "WebClass"])
        .arg(&batch)
        .args(["--kind", "portal"])
        .assert()
        .success()
        .stdout(contains("1 new, 0 updated"));

    fs::write(
        &batch,
        r#"[{"course": "10234 Linear Algebra (2024 Spring)", "title": "Report 1",
             "start": "2024/04/01 09:00", "end": "2024/05/08 17:00", "link": "https://portal.test/1"}]"#,
    )
    .unwrap();
    duesync_cmd(home.path())
        .args(["ingest", "WebClass"])
        .arg(&batch)
        .args(["--kind", "portal"])
        .assert()
        .success()
        .stdout(contains("0 new, 1 updated"));

    let rows = FileRecordStore::at(home.path())
        .read_rows("WebClass")
        .unwrap()
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][1], "Linear Algebra");
    assert_eq!(rows[1][4], "2024/05/08 17:00");
}

#[test]
fn classroom_ingest_reports_undated_items() {
    let home = TempDir::new().expect("home");
    let batch = home.path().join("classroom.json");
    fs::write(
        &batch,
        r#"[
            {"course": "Biology", "title": "Lab", "dueDate": {"year": 2024, "month": 5, "day": 1},
             "dueTime": {"hours": 9}, "link": "https://classroom.test/1"},
            {"course": "Biology", "title": "Reading", "link": "https://classroom.test/2"}
        ]"#,
    )
    .unwrap();

    duesync_cmd(home.path())
        .args(["ingest", "Classroom"])
        .arg(&batch)
        .args(["--kind", "classroom"])
        .assert()
        .success()
        .stdout(contains("1 new"))
        .stdout(contains("1 item(s) without a due date skipped"));

    let rows = FileRecordStore::at(home.path())
        .read_rows("Classroom")
        .unwrap()
        .unwrap();
    assert_eq!(rows[1][4], "2024/05/01 09:00");
}

#[test]
fn ingest_rejects_malformed_batch() {
    let home = TempDir::new().expect("home");
    let batch = home.path().join("bad.json");
    fs::write(&batch, "not json").unwrap();

    duesync_cmd(home.path())
        .args(["ingest", "WebClass"])
        .arg(&batch)
        .args(["--kind", "portal"])
        .assert()
        .failure()
        .stderr(contains("not a valid Portal batch"));
}
