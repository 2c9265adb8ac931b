use chrono::Duration;
use duesync_core::{parse_due, AssignmentRecord, SourceKind};
use duesync_renderer::{RenderError, TaskComposer};
use tempfile::TempDir;

fn record() -> AssignmentRecord {
    AssignmentRecord::new(
        SourceKind::Classroom,
        "Chemistry",
        "Titration",
        "2024年5月1日 9時30分",
        "https://classroom.test/t",
    )
}

#[test]
fn user_title_template_overrides_embedded() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join(".duesync").join("templates");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("title.tera"), "{{ course }} / {{ title }}").unwrap();

    let composer = TaskComposer::at(home.path()).unwrap();
    let rec = record();
    let due = parse_due(&rec.due).unwrap();
    let payload = composer.compose(&rec, &due, due.at - Duration::days(1)).unwrap();

    assert_eq!(payload.title, "Chemistry / Titration");
    assert!(payload.notes.starts_with("リンク:\n"), "notes keep the embedded template");
}

#[test]
fn missing_template_dir_uses_embedded() {
    let home = TempDir::new().unwrap();
    let composer = TaskComposer::at(home.path()).unwrap();
    let rec = record();
    let due = parse_due(&rec.due).unwrap();
    let payload = composer.compose(&rec, &due, due.at - Duration::days(30)).unwrap();
    assert_eq!(payload.title, "[Chemistry] Titration (05/01(Wed) 09:30まで)");
}

#[test]
fn broken_user_template_fails_to_load() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join(".duesync").join("templates");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("notes.tera"), "{% if %}").unwrap();

    let err = TaskComposer::at(home.path()).err().expect("must fail");
    assert!(matches!(err, RenderError::Template(_)), "got: {err}");
}

#[test]
fn no_crlf_in_rendered_output() {
    let composer = TaskComposer::new().unwrap();
    let rec = record();
    let due = parse_due(&rec.due).unwrap();
    let payload = composer.compose(&rec, &due, due.at).unwrap();
    assert!(!payload.title.contains('\r'));
    assert!(!payload.notes.contains('\r'));
}

#[test]
fn blank_title_override_is_rejected() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join(".duesync").join("templates");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("title.tera"), "  {# nothing #}\n").unwrap();

    let composer = TaskComposer::at(home.path()).unwrap();
    let rec = record();
    let due = parse_due(&rec.due).unwrap();
    let err = composer.compose(&rec, &due, due.at).unwrap_err();
    assert!(matches!(err, RenderError::EmptyTitle(ref t) if t == "Titration"), "got: {err}");
}

#[test]
fn unknown_variable_fails_at_render_time() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join(".duesync").join("templates");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("notes.tera"), "{{ instructor }}").unwrap();

    let composer = TaskComposer::at(home.path()).unwrap();
    let rec = record();
    let due = parse_due(&rec.due).unwrap();
    let err = composer.compose(&rec, &due, due.at).unwrap_err();
    assert!(matches!(err, RenderError::Render { ref name, .. } if name == "notes.tera"), "got: {err}");
}
