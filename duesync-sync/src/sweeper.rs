//! Retention sweep.
//!
//! Rows are scanned from last to first so a deletion never shifts a row
//! still waiting to be visited. A row is deleted when:
//!
//! 1. its state is completed, deleted or expired and its due date is more
//!    than `cleanup_days` in the past;
//! 2. its state is deleted and its due cell does not parse;
//! 3. it carries no task id and its due date is more than `cleanup_days`
//!    in the past.
//!
//! Aging uses the parsed timestamp itself, not the end-of-day deadline.
//! Rows that fail to decode are always kept.

use chrono::{DateTime, Duration, Local};

use duesync_core::{parse_due, AssignmentRecord, RecordStore, SyncState};

use crate::error::SyncError;

/// Which retention rule matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepReason {
    /// Finished (completed, deleted or expired) and older than the window.
    Finished,
    /// Deleted remotely and the due cell no longer parses.
    DeletedWithoutDue,
    /// Never registered and older than the window.
    NeverRegistered,
}

/// One row removed (or, in dry run, that would be removed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweptRow {
    /// Row index at the time of the scan.
    pub row: usize,
    pub course: String,
    pub title: String,
    pub reason: SweepReason,
    /// `false` in dry run.
    pub deleted: bool,
}

/// Retention decision for a single record.
pub fn sweep_reason(
    record: &AssignmentRecord,
    now: DateTime<Local>,
    cleanup_days: u32,
) -> Option<SweepReason> {
    let due = parse_due(&record.due);
    let aged_out = due
        .map(|d| now - d.at > Duration::days(i64::from(cleanup_days)))
        .unwrap_or(false);

    if record.state.is_terminal() && aged_out {
        return Some(SweepReason::Finished);
    }
    if matches!(record.state, SyncState::Deleted { .. }) && due.is_none() {
        return Some(SweepReason::DeletedWithoutDue);
    }
    if record.state.task_id().is_none() && aged_out {
        return Some(SweepReason::NeverRegistered);
    }
    None
}

/// Apply the retention rules to one sheet.
///
/// Missing and header-only sheets yield an empty list.
pub fn sweep_sheet<St: RecordStore + ?Sized>(
    store: &mut St,
    sheet: &str,
    now: DateTime<Local>,
    cleanup_days: u32,
    dry_run: bool,
) -> Result<Vec<SweptRow>, SyncError> {
    let Some(rows) = store.read_rows(sheet)? else {
        return Ok(vec![]);
    };

    let mut swept = Vec::new();
    for index in (1..rows.len()).rev() {
        let record = match AssignmentRecord::from_row(&rows[index]) {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!("{sheet} row {index}: undecodable ({e}); kept");
                continue;
            }
        };
        let Some(reason) = sweep_reason(&record, now, cleanup_days) else {
            continue;
        };

        if dry_run {
            tracing::info!("[dry-run] would delete {sheet} row {index}: [{}] {}", record.course, record.title);
        } else {
            store.delete_row(sheet, index)?;
            tracing::info!("deleted {sheet} row {index}: [{}] {} ({reason:?})", record.course, record.title);
        }
        swept.push(SweptRow {
            row: index,
            course: record.course,
            title: record.title,
            reason,
            deleted: !dry_run,
        });
    }
    Ok(swept)
}
