//! Turning upstream assignment tuples into sheet rows.
//!
//! Two producers feed the store: the learning portal scraper and the
//! classroom-service query. They hand over differently shaped tuples; both
//! end up as rows over [`crate::types::HEADER`] with empty id/flag cells.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::{
    header_row, Row, SourceKind, COL_COURSE, COL_DUE, COL_LINK, COL_SOURCE, COL_START, COL_TITLE,
    HEADER,
};

static LEADING_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+\s*").expect("valid leading code regex"));
static TRAILING_PAREN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(.*\)\s*$").expect("valid trailing paren regex"));

/// One assignment scraped from the learning portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalAssignment {
    pub course: String,
    pub title: String,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default)]
    pub link: String,
}

/// Calendar date as the classroom service reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// Time of day as the classroom service reports it; either part may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkTime {
    #[serde(default)]
    pub hours: Option<u32>,
    #[serde(default)]
    pub minutes: Option<u32>,
}

/// One published course work item from the classroom service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomWork {
    pub course: String,
    pub title: String,
    #[serde(default)]
    pub due_date: Option<WorkDate>,
    #[serde(default)]
    pub due_time: Option<WorkTime>,
    #[serde(default)]
    pub link: String,
}

/// Strip the leading course code and trailing parenthesized term from a
/// portal course name: `"12345 Linear Algebra (2024 Spring)"` → `"Linear Algebra"`.
pub fn clean_course_name(raw: &str) -> String {
    let without_code = LEADING_CODE_RE.replace(raw, "");
    TRAILING_PAREN_RE
        .replace(&without_code, "")
        .trim()
        .to_string()
}

/// `[WebClass, course, title, start, end, link, "", ""]`.
pub fn portal_row(a: &PortalAssignment) -> Row {
    vec![
        SourceKind::WebClass.to_string(),
        clean_course_name(&a.course),
        a.title.clone(),
        a.start.clone(),
        a.end.clone(),
        a.link.clone(),
        String::new(),
        String::new(),
    ]
}

/// `[Classroom, course, title, "", "YYYY/MM/DD HH:MM", link, "", ""]`, or
/// `None` when the work has no due date.
pub fn classroom_row(w: &ClassroomWork) -> Option<Row> {
    let date = w.due_date?;
    let time = w.due_time.unwrap_or_default();
    let due = format!(
        "{:04}/{:02}/{:02} {:02}:{:02}",
        date.year,
        date.month,
        date.day,
        time.hours.unwrap_or(0),
        time.minutes.unwrap_or(0),
    );
    Some(vec![
        SourceKind::Classroom.to_string(),
        w.course.clone(),
        w.title.clone(),
        String::new(),
        due,
        w.link.clone(),
        String::new(),
        String::new(),
    ])
}

fn identity(row: &[String]) -> (&str, &str, &str) {
    let cell = |i: usize| row.get(i).map(String::as_str).unwrap_or("");
    (cell(COL_SOURCE), cell(COL_COURSE), cell(COL_TITLE))
}

/// Merge a fresh batch of scraped rows into an existing sheet.
///
/// - The header is kept (or created when `existing` is empty).
/// - A data row with the same `(source, course, title)` as an incoming row
///   keeps its id/flag cells and takes the incoming start/due/link.
/// - Unmatched incoming rows are appended with empty id/flag cells.
/// - Existing rows absent from the batch are kept; only the retention sweep
///   deletes rows.
///
/// Returns the merged rows and how many were appended.
pub fn merge_rows(existing: Vec<Row>, incoming: &[Row]) -> (Vec<Row>, usize) {
    let mut rows = existing;
    if rows.is_empty() {
        rows.push(header_row());
    }

    let mut appended = 0;
    for new_row in incoming {
        let key = identity(new_row);
        let found = rows
            .iter()
            .skip(1)
            .position(|r| identity(r) == key)
            .map(|i| i + 1);
        match found {
            Some(index) => {
                let row = &mut rows[index];
                if row.len() < HEADER.len() {
                    row.resize(HEADER.len(), String::new());
                }
                for col in [COL_START, COL_DUE, COL_LINK] {
                    row[col] = new_row.get(col).cloned().unwrap_or_default();
                }
            }
            None => {
                let mut row = new_row.clone();
                row.resize(HEADER.len(), String::new());
                rows.push(row);
                appended += 1;
            }
        }
    }
    (rows, appended)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{COL_FLAG, COL_TASK_ID};

    #[test]
    fn cleans_portal_course_names() {
        assert_eq!(
            clean_course_name("  12345 Linear Algebra (2024 Spring) "),
            "Linear Algebra"
        );
        assert_eq!(clean_course_name("Physics"), "Physics");
    }

    #[test]
    fn classroom_row_formats_due_with_default_time() {
        let work = ClassroomWork {
            course: "Bio".into(),
            title: "Essay".into(),
            due_date: Some(WorkDate { year: 2024, month: 5, day: 1 }),
            due_time: Some(WorkTime { hours: Some(9), minutes: None }),
            link: "https://classroom.test/w/1".into(),
        };
        let row = classroom_row(&work).expect("row");
        assert_eq!(row[COL_SOURCE], "Classroom");
        assert_eq!(row[COL_DUE], "2024/05/01 09:00");
        assert_eq!(row[COL_START], "");
    }

    #[test]
    fn classroom_work_without_due_is_dropped() {
        let work = ClassroomWork {
            course: "Bio".into(),
            title: "Reading".into(),
            due_date: None,
            due_time: None,
            link: String::new(),
        };
        assert!(classroom_row(&work).is_none());
    }

    #[test]
    fn merge_keeps_state_and_updates_due() {
        let mut registered = portal_row(&PortalAssignment {
            course: "Math".into(),
            title: "HW1".into(),
            start: String::new(),
            end: "2024/05/01".into(),
            link: "old".into(),
        });
        registered[COL_TASK_ID] = "t1".into();
        registered[COL_FLAG] = "REGISTERED".into();
        let existing = vec![header_row(), registered];

        let incoming = vec![
            portal_row(&PortalAssignment {
                course: "Math".into(),
                title: "HW1".into(),
                start: String::new(),
                end: "2024/05/02".into(),
                link: "new".into(),
            }),
            portal_row(&PortalAssignment {
                course: "Math".into(),
                title: "HW2".into(),
                start: String::new(),
                end: "2024/05/09".into(),
                link: "l2".into(),
            }),
        ];

        let (rows, appended) = merge_rows(existing, &incoming);
        assert_eq!(appended, 1);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][COL_DUE], "2024/05/02");
        assert_eq!(rows[1][COL_LINK], "new");
        assert_eq!(rows[1][COL_TASK_ID], "t1");
        assert_eq!(rows[1][COL_FLAG], "REGISTERED");
        assert_eq!(rows[2][COL_TITLE], "HW2");
    }

    #[test]
    fn merge_into_empty_sheet_adds_header() {
        let incoming = vec![portal_row(&PortalAssignment {
            course: "Art".into(),
            title: "Sketch".into(),
            start: String::new(),
            end: String::new(),
            link: String::new(),
        })];
        let (rows, appended) = merge_rows(vec![], &incoming);
        assert_eq!(rows[0], header_row());
        assert_eq!(appended, 1);
    }
}
