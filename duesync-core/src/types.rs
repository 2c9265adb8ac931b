//! Domain types for assignment rows.
//!
//! A sheet is an ordered table of [`Row`]s. Row 0 is the header; every other
//! row decodes into an [`AssignmentRecord`] over the fixed column schema
//! [`HEADER`]. The two trailing columns (external task id and sync flag) are
//! folded into a single [`SyncState`] on decode and split back out on encode.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// One raw sheet row. Cells are always text.
pub type Row = Vec<String>;

/// Fixed column schema, in order.
pub const HEADER: [&str; 8] = [
    "source", "course", "title", "start", "due", "link", "task_id", "flag",
];

pub const COL_SOURCE: usize = 0;
pub const COL_COURSE: usize = 1;
pub const COL_TITLE: usize = 2;
pub const COL_START: usize = 3;
pub const COL_DUE: usize = 4;
pub const COL_LINK: usize = 5;
pub const COL_TASK_ID: usize = 6;
pub const COL_FLAG: usize = 7;

/// Header row as owned cells.
pub fn header_row() -> Row {
    HEADER.iter().map(|c| (*c).to_string()).collect()
}

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identifier assigned by the task service once registration succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Where a row was scraped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// The learning portal.
    WebClass,
    /// The classroom service.
    Classroom,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::WebClass => "WebClass",
            SourceKind::Classroom => "Classroom",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webclass" | "portal" => Ok(SourceKind::WebClass),
            "classroom" => Ok(SourceKind::Classroom),
            _ => Err(RecordError::UnknownSource(s.to_string())),
        }
    }
}

pub const FLAG_REGISTERED: &str = "REGISTERED";
pub const FLAG_COMPLETED: &str = "COMPLETED";
pub const FLAG_DELETED: &str = "DELETED";
pub const FLAG_EXPIRED: &str = "EXPIRED";

/// Sync state of one record against the task service.
///
/// Replaces the legacy pair of nullable `task_id` / `flag` cells so that an
/// expired record can never carry an id and a completed one always does.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncState {
    /// Not yet registered. Eligible for registration.
    #[default]
    Pending,
    /// Registered as an open remote task.
    Registered { id: TaskId },
    /// The remote task was completed.
    Completed { id: TaskId },
    /// The remote task disappeared. `id` is absent for legacy rows that were
    /// flagged without ever storing one.
    Deleted { id: Option<TaskId> },
    /// The deadline passed before the record was ever registered.
    Expired,
}

impl SyncState {
    /// Decode the `(task_id, flag)` cell pair.
    pub fn from_cells(task_id: &str, flag: &str) -> Result<Self, RecordError> {
        let id = task_id.trim();
        let id = (!id.is_empty()).then(|| TaskId::from(id));
        match (flag.trim(), id) {
            ("", None) => Ok(SyncState::Pending),
            ("", Some(id)) | (FLAG_REGISTERED, Some(id)) => Ok(SyncState::Registered { id }),
            (FLAG_REGISTERED, None) => Ok(SyncState::Pending),
            (FLAG_COMPLETED, Some(id)) => Ok(SyncState::Completed { id }),
            (FLAG_COMPLETED, None) => Err(RecordError::InvalidState {
                flag: FLAG_COMPLETED.to_string(),
                reason: "requires a task id",
            }),
            (FLAG_DELETED, id) => Ok(SyncState::Deleted { id }),
            (FLAG_EXPIRED, None) => Ok(SyncState::Expired),
            (FLAG_EXPIRED, Some(_)) => Err(RecordError::InvalidState {
                flag: FLAG_EXPIRED.to_string(),
                reason: "must not carry a task id",
            }),
            (other, _) => Err(RecordError::UnknownFlag(other.to_string())),
        }
    }

    /// Encode back into the `(task_id, flag)` cell pair.
    pub fn to_cells(&self) -> (String, String) {
        let id_cell = self.task_id().map(|id| id.0.clone()).unwrap_or_default();
        (id_cell, self.flag().to_string())
    }

    /// The flag cell text for this state.
    pub fn flag(&self) -> &'static str {
        match self {
            SyncState::Pending => "",
            SyncState::Registered { .. } => FLAG_REGISTERED,
            SyncState::Completed { .. } => FLAG_COMPLETED,
            SyncState::Deleted { .. } => FLAG_DELETED,
            SyncState::Expired => FLAG_EXPIRED,
        }
    }

    /// External task id, when the state carries one.
    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            SyncState::Registered { id } | SyncState::Completed { id } => Some(id),
            SyncState::Deleted { id } => id.as_ref(),
            SyncState::Pending | SyncState::Expired => None,
        }
    }

    /// Completed, deleted, and expired records are never touched by the
    /// reconciliation engine again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncState::Completed { .. } | SyncState::Deleted { .. } | SyncState::Expired
        )
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Pending => f.write_str("PENDING"),
            other => f.write_str(other.flag()),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One data row of a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentRecord {
    pub source: SourceKind,
    pub course: String,
    pub title: String,
    pub start: Option<String>,
    pub due: String,
    pub link: String,
    pub state: SyncState,
}

impl AssignmentRecord {
    /// A freshly ingested record in the [`SyncState::Pending`] state.
    pub fn new(
        source: SourceKind,
        course: impl Into<String>,
        title: impl Into<String>,
        due: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            source,
            course: course.into(),
            title: title.into(),
            start: None,
            due: due.into(),
            link: link.into(),
            state: SyncState::Pending,
        }
    }

    /// Decode a data row. Short rows are treated as padded with empty cells.
    pub fn from_row(row: &[String]) -> Result<Self, RecordError> {
        let cell = |i: usize| row.get(i).map(String::as_str).unwrap_or("");
        let start = cell(COL_START).trim();
        Ok(Self {
            source: cell(COL_SOURCE).parse()?,
            course: cell(COL_COURSE).to_string(),
            title: cell(COL_TITLE).to_string(),
            start: (!start.is_empty()).then(|| start.to_string()),
            due: cell(COL_DUE).to_string(),
            link: cell(COL_LINK).to_string(),
            state: SyncState::from_cells(cell(COL_TASK_ID), cell(COL_FLAG))?,
        })
    }

    /// Encode into a fresh row over [`HEADER`].
    pub fn to_row(&self) -> Row {
        let (id, flag) = self.state.to_cells();
        vec![
            self.source.to_string(),
            self.course.clone(),
            self.title.clone(),
            self.start.clone().unwrap_or_default(),
            self.due.clone(),
            self.link.clone(),
            id,
            flag,
        ]
    }

    /// Write only the state cells into an existing row, padding it to the
    /// schema width. Any extra trailing cells are preserved.
    pub fn write_state(&self, row: &mut Row) {
        if row.len() < HEADER.len() {
            row.resize(HEADER.len(), String::new());
        }
        let (id, flag) = self.state.to_cells();
        row[COL_TASK_ID] = id;
        row[COL_FLAG] = flag;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn newtype_display() {
        assert_eq!(TaskId::from("t-01").to_string(), "t-01");
        assert_eq!(SourceKind::Classroom.to_string(), "Classroom");
    }

    #[test]
    fn decodes_pending_row_with_empty_trailing_cells() {
        let r = row(&["WebClass", "Math", "HW1", "", "2024/05/01", "https://x", "", ""]);
        let rec = AssignmentRecord::from_row(&r).expect("decode");
        assert_eq!(rec.source, SourceKind::WebClass);
        assert_eq!(rec.state, SyncState::Pending);
        assert_eq!(rec.start, None);
    }

    #[test]
    fn short_row_is_padded() {
        let r = row(&["Classroom", "Physics", "Lab"]);
        let rec = AssignmentRecord::from_row(&r).expect("decode");
        assert_eq!(rec.due, "");
        assert_eq!(rec.state, SyncState::Pending);
    }

    #[test]
    fn id_without_flag_is_registered() {
        let state = SyncState::from_cells("abc", "").expect("decode");
        assert_eq!(state, SyncState::Registered { id: TaskId::from("abc") });
    }

    #[test]
    fn registered_flag_without_id_is_pending() {
        assert_eq!(
            SyncState::from_cells("", "REGISTERED").expect("decode"),
            SyncState::Pending
        );
    }

    #[test]
    fn expired_with_id_is_rejected() {
        let err = SyncState::from_cells("abc", "EXPIRED").unwrap_err();
        assert!(matches!(err, RecordError::InvalidState { .. }));
    }

    #[test]
    fn completed_without_id_is_rejected() {
        assert!(SyncState::from_cells("", "COMPLETED").is_err());
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let err = SyncState::from_cells("", "DONE").unwrap_err();
        assert_eq!(err, RecordError::UnknownFlag("DONE".to_string()));
    }

    #[test]
    fn deleted_keeps_optional_id() {
        assert_eq!(
            SyncState::from_cells("", "DELETED").expect("decode"),
            SyncState::Deleted { id: None }
        );
        let with_id = SyncState::from_cells("t1", "DELETED").expect("decode");
        assert_eq!(with_id.task_id(), Some(&TaskId::from("t1")));
    }

    #[test]
    fn write_state_preserves_extra_cells() {
        let mut r = row(&["WebClass", "Math", "HW1", "", "2024/05/01", "l", "", "", "note"]);
        let mut rec = AssignmentRecord::from_row(&r).expect("decode");
        rec.state = SyncState::Registered { id: TaskId::from("t9") };
        rec.write_state(&mut r);
        assert_eq!(r[COL_TASK_ID], "t9");
        assert_eq!(r[COL_FLAG], "REGISTERED");
        assert_eq!(r[8], "note");
    }

    #[test]
    fn terminal_states() {
        assert!(!SyncState::Pending.is_terminal());
        assert!(!SyncState::Registered { id: TaskId::from("x") }.is_terminal());
        assert!(SyncState::Expired.is_terminal());
        assert!(SyncState::Deleted { id: None }.is_terminal());
    }
}
