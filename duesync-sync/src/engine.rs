//! Reconciliation engine.
//!
//! ## Per-sheet protocol
//!
//! 1. Load a snapshot of every row.
//! 2. Decode each data row (row 0 is the header and never touched).
//! 3. Compute the outcome for each record against the task service,
//!    writing new state cells into the in-memory copy.
//! 4. Commit the copy with a single `write_rows` only if some row changed.
//!
//! A failure on one record is logged and reported; it never stops its
//! siblings.

use chrono::{DateTime, Local};

use duesync_core::types::{COL_COURSE, COL_TITLE};
use duesync_core::{parse_due, AssignmentRecord, RecordStore, Row, SyncState, TaskId};
use duesync_renderer::TaskComposer;
use duesync_tasks::{NewTask, TaskService, TaskServiceError};

use crate::error::SyncError;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What happened to one record during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Nothing to do: terminal state, or still open remotely.
    Unchanged,
    /// Pending, but the due cell is empty or unparsable.
    SkippedNoDue,
    /// Pending and already past its deadline.
    Expired,
    Registered { task_id: TaskId },
    /// Dry run: this title would have been inserted.
    WouldRegister { title: String },
    Completed,
    Deleted,
    /// A transient task-service or composition failure; the record is untouched.
    Failed { reason: String },
    /// The row's id/flag cells could not be decoded; the row is untouched.
    Invalid { reason: String },
}

impl RecordOutcome {
    /// Whether the record's state cells change.
    pub fn changes_state(&self) -> bool {
        matches!(
            self,
            RecordOutcome::Expired
                | RecordOutcome::Registered { .. }
                | RecordOutcome::Completed
                | RecordOutcome::Deleted
        )
    }
}

/// One record's outcome, with enough context to print it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordReport {
    /// Row index within the sheet (1-based; row 0 is the header).
    pub row: usize,
    pub course: String,
    pub title: String,
    pub outcome: RecordOutcome,
}

/// Result of reconciling one sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetReconcile {
    pub records: Vec<RecordReport>,
    /// The sheet was rewritten.
    pub committed: bool,
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Everything one pass needs to reconcile records.
pub struct Reconciler<'a, S: TaskService + ?Sized> {
    pub service: &'a S,
    pub list_id: &'a str,
    pub composer: &'a TaskComposer,
    pub now: DateTime<Local>,
    pub dry_run: bool,
}

impl<'a, S: TaskService + ?Sized> Reconciler<'a, S> {
    /// Decide and apply the transition for one decoded record.
    ///
    /// On a state change `record.state` is updated in place; otherwise the
    /// record is left exactly as it was.
    pub fn reconcile_record(&self, record: &mut AssignmentRecord) -> RecordOutcome {
        match record.state.clone() {
            SyncState::Registered { id } => self.check_registered(record, id),
            SyncState::Pending => self.register_pending(record),
            SyncState::Completed { .. } | SyncState::Deleted { .. } | SyncState::Expired => {
                RecordOutcome::Unchanged
            }
        }
    }

    fn check_registered(&self, record: &mut AssignmentRecord, id: TaskId) -> RecordOutcome {
        match self.service.get_task(self.list_id, &id.0) {
            Ok(task) if task.is_completed() => {
                tracing::info!("completed: [{}] {} ({id})", record.course, record.title);
                record.state = SyncState::Completed { id };
                RecordOutcome::Completed
            }
            Ok(_) => RecordOutcome::Unchanged,
            Err(TaskServiceError::NotFound(_)) => {
                tracing::info!("deleted remotely: [{}] {} ({id})", record.course, record.title);
                record.state = SyncState::Deleted { id: Some(id) };
                RecordOutcome::Deleted
            }
            Err(e) => {
                tracing::warn!(
                    "status check failed for [{}] {} ({id}): {e}",
                    record.course,
                    record.title
                );
                RecordOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn register_pending(&self, record: &mut AssignmentRecord) -> RecordOutcome {
        let Some(due) = parse_due(&record.due) else {
            tracing::debug!(
                "no usable due date for [{}] {} ({:?}); skipping",
                record.course,
                record.title,
                record.due
            );
            return RecordOutcome::SkippedNoDue;
        };

        if due.at < self.now {
            tracing::info!("expired before registration: [{}] {}", record.course, record.title);
            record.state = SyncState::Expired;
            return RecordOutcome::Expired;
        }

        let payload = match self.composer.compose(record, &due, self.now) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("could not compose task for [{}] {}: {e}", record.course, record.title);
                return RecordOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        if self.dry_run {
            tracing::info!("[dry-run] would register: {}", payload.title);
            return RecordOutcome::WouldRegister {
                title: payload.title,
            };
        }

        let new_task = NewTask {
            title: payload.title,
            due: payload.due,
            notes: payload.notes,
        };
        match self.service.insert_task(self.list_id, &new_task) {
            Ok(task) if !task.id.trim().is_empty() => {
                tracing::info!("registered: {} ({})", new_task.title, task.id);
                let id = TaskId::from(task.id);
                record.state = SyncState::Registered { id: id.clone() };
                RecordOutcome::Registered { task_id: id }
            }
            Ok(_) => {
                tracing::warn!("task service returned an empty id for {}", new_task.title);
                RecordOutcome::Failed {
                    reason: "empty task id".to_string(),
                }
            }
            Err(e) => {
                tracing::warn!(
                    "registration failed for [{}] {}: {e}",
                    record.course,
                    record.title
                );
                RecordOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Reconcile every data row of `sheet` and commit once if anything changed.
    ///
    /// Returns `None` when the sheet is missing or holds only the header.
    pub fn reconcile_sheet<St: RecordStore + ?Sized>(
        &self,
        store: &mut St,
        sheet: &str,
    ) -> Result<Option<SheetReconcile>, SyncError> {
        let Some(mut rows) = store.read_rows(sheet)? else {
            tracing::info!("sheet '{sheet}' does not exist; skipping");
            return Ok(None);
        };
        if rows.len() <= 1 {
            tracing::debug!("sheet '{sheet}' has no data rows; skipping");
            return Ok(None);
        }

        let mut result = SheetReconcile::default();
        let mut changed = false;
        for (index, row) in rows.iter_mut().enumerate().skip(1) {
            let report = self.reconcile_row(sheet, index, row);
            changed |= report.outcome.changes_state();
            result.records.push(report);
        }

        if changed && !self.dry_run {
            store.write_rows(sheet, &rows)?;
            result.committed = true;
            tracing::info!("committed sheet '{sheet}'");
        }
        Ok(Some(result))
    }

    fn reconcile_row(&self, sheet: &str, index: usize, row: &mut Row) -> RecordReport {
        let mut record = match AssignmentRecord::from_row(row.as_slice()) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("{sheet} row {index}: cannot decode ({e}); leaving untouched");
                return RecordReport {
                    row: index,
                    course: cell(row, COL_COURSE),
                    title: cell(row, COL_TITLE),
                    outcome: RecordOutcome::Invalid {
                        reason: e.to_string(),
                    },
                };
            }
        };

        let outcome = self.reconcile_record(&mut record);
        if outcome.changes_state() {
            record.write_state(row);
        }
        RecordReport {
            row: index,
            course: record.course,
            title: record.title,
            outcome,
        }
    }
}

fn cell(row: &[String], col: usize) -> String {
    row.get(col).cloned().unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
