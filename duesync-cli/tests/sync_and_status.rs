use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;

use duesync_core::{header_row, props, FileRecordStore, RecordStore, Row};
use tempfile::TempDir;

fn duesync_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("duesync"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("GOOGLE_TASKS_ACCESS_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

fn row(title: &str, task_id: &str, flag: &str) -> Row {
    ["WebClass", "Algebra", title, "", "2024/05/01 17:00", "https://portal.test", task_id, flag]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[test]
fn sync_without_task_list_is_a_no_op() {
    let home = TempDir::new().expect("home");
    duesync_cmd(home.path()).arg("init").assert().success();
    let sheet = FileRecordStore::at(home.path()).sheet_path("WebClass");
    let before = std::fs::read_to_string(&sheet).unwrap();

    duesync_cmd(home.path())
        .arg("sync")
        .assert()
        .success()
        .stdout(contains("No task list configured"));

    assert_eq!(std::fs::read_to_string(&sheet).unwrap(), before);
    assert!(props::load_at(home.path()).unwrap().last_run_at.is_none());
}

#[test]
fn sync_with_task_list_needs_a_token() {
    let home = TempDir::new().expect("home");
    props::update_at(home.path(), |p| p.task_list_id = Some("L".to_string())).unwrap();

    duesync_cmd(home.path())
        .args(["sync", "--dry-run"])
        .assert()
        .failure()
        .stderr(contains("GOOGLE_TASKS_ACCESS_TOKEN"));
}

#[test]
fn tasklist_needs_a_token() {
    let home = TempDir::new().expect("home");
    duesync_cmd(home.path())
        .args(["tasklist", "--name", "Homework"])
        .assert()
        .failure()
        .stderr(contains("GOOGLE_TASKS_ACCESS_TOKEN"));
    assert!(props::load_at(home.path()).unwrap().task_list_id.is_none());
}

#[test]
fn status_json_counts_states_per_sheet() {
    let home = TempDir::new().expect("home");
    duesync_cmd(home.path()).arg("init").assert().success();
    FileRecordStore::at(home.path())
        .write_rows(
            "WebClass",
            &[
                header_row(),
                row("a", "", ""),
                row("b", "t1", "REGISTERED"),
                row("c", "t2", "COMPLETED"),
            ],
        )
        .unwrap();
    props::update_at(home.path(), |p| p.task_list_id = Some("L".to_string())).unwrap();

    let assert = duesync_cmd(home.path())
        .args(["status", "--json"])
        .assert()
        .success();
    let json: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("status JSON");

    assert_eq!(json["task_list_id"], "L");
    assert!(json["last_run_at"].is_null());
    let web = &json["sheets"][0];
    assert_eq!(web["sheet"], "WebClass");
    assert_eq!(web["rows"], 3);
    assert_eq!(web["pending"], 1);
    assert_eq!(web["registered"], 1);
    assert_eq!(web["completed"], 1);
    assert_eq!(json["sheets"][1]["rows"], 0);
}

#[test]
fn status_table_flags_missing_sheets() {
    let home = TempDir::new().expect("home");
    duesync_cmd(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("not configured"))
        .stdout(contains("missing sheet(s): WebClass, Classroom"));
}

#[test]
fn daemon_status_when_stopped() {
    let home = TempDir::new().expect("home");
    duesync_cmd(home.path())
        .args(["daemon", "status"])
        .assert()
        .success()
        .stdout(contains("\"running\": false"));

    duesync_cmd(home.path())
        .args(["daemon", "stop"])
        .assert()
        .success()
        .stdout(contains("daemon is not running"));

    duesync_cmd(home.path())
        .args(["daemon", "logs"])
        .assert()
        .success()
        .stdout(contains("log file not found"));
}
