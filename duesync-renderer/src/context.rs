//! Template context: serializable rendering payload built from one record.

use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};

use duesync_core::{AssignmentRecord, DueDate};

use crate::error::RenderError;

/// How close a deadline must be for the title to carry the urgency marker.
pub const URGENCY_WINDOW_DAYS: i64 = 3;

/// Display format for due dates, e.g. `05/01(Wed) 17:00`.
pub const DUE_DISPLAY_FORMAT: &str = "%m/%d(%a) %H:%M";

/// Values available to `title.tera` and `notes.tera`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskContext {
    pub course: String,
    pub title: String,
    pub link: String,
    /// `WebClass` or `Classroom`.
    pub source: String,
    /// Parsed due time formatted with [`DUE_DISPLAY_FORMAT`]; midnight for
    /// date-only input.
    pub due_display: String,
    /// Parsed due time falls within `[now, now + 3 days]`.
    pub urgent: bool,
}

impl TaskContext {
    /// Build the context for `record`, whose `due` cell parsed to `due`.
    pub fn from_record(record: &AssignmentRecord, due: &DueDate, now: DateTime<Local>) -> Self {
        TaskContext {
            course: record.course.clone(),
            title: record.title.clone(),
            link: record.link.clone(),
            source: record.source.to_string(),
            due_display: due.at.format(DUE_DISPLAY_FORMAT).to_string(),
            urgent: is_urgent(due.at, now),
        }
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}

/// `0 <= deadline - now <= 3 days`.
pub fn is_urgent(deadline: DateTime<Local>, now: DateTime<Local>) -> bool {
    let remaining = deadline - now;
    remaining >= Duration::zero() && remaining <= Duration::days(URGENCY_WINDOW_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use duesync_core::{parse_due, SourceKind};

    #[test]
    fn context_fields_populated() {
        let record = AssignmentRecord::new(
            SourceKind::Classroom,
            "Biology",
            "Lab report",
            "2024/05/01 17:00",
            "https://classroom.test/1",
        );
        let due = parse_due(&record.due).expect("due");
        let ctx = TaskContext::from_record(&record, &due, due.at - Duration::days(10));
        assert_eq!(ctx.source, "Classroom");
        assert_eq!(ctx.due_display, "05/01(Wed) 17:00");
        assert!(!ctx.urgent);
    }

    #[test]
    fn date_only_due_displays_midnight() {
        let record = AssignmentRecord::new(SourceKind::WebClass, "Math", "HW", "2024/05/01", "l");
        let due = parse_due(&record.due).expect("due");
        let ctx = TaskContext::from_record(&record, &due, due.at + Duration::hours(12));
        assert_eq!(ctx.due_display, "05/01(Wed) 00:00");
        assert!(!ctx.urgent, "past the parsed due time");
    }

    #[test]
    fn urgency_window_is_inclusive() {
        let now = Local::now();
        assert!(is_urgent(now, now));
        assert!(is_urgent(now + Duration::days(3), now));
        assert!(!is_urgent(now + Duration::days(3) + Duration::seconds(1), now));
        assert!(!is_urgent(now - Duration::seconds(1), now));
    }

    #[test]
    fn to_tera_context_succeeds() {
        let record = AssignmentRecord::new(SourceKind::WebClass, "c", "t", "2024/05/01", "l");
        let due = parse_due(&record.due).expect("due");
        let ctx = TaskContext::from_record(&record, &due, Local::now());
        ctx.to_tera_context().expect("context conversion");
    }
}
