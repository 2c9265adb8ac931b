//! Shared pass entrypoint used by CLI and daemon.
//!
//! One pass:
//!
//! 1. Load settings (an unreadable settings file aborts the pass).
//! 2. Load props; with no task list configured the pass is skipped.
//! 3. Reconcile every tracked sheet.
//! 4. Sweep every reconciled sheet.
//! 5. Record `last_run_at` (not in dry run).

use std::path::Path;

use chrono::{DateTime, Local, Utc};

use duesync_core::{props, FileRecordStore, RecordStore, Settings};
use duesync_renderer::TaskComposer;
use duesync_tasks::TaskService;

use crate::engine::{RecordOutcome, RecordReport, Reconciler};
use crate::error::SyncError;
use crate::sweeper::{sweep_sheet, SweptRow};

/// Which sheets a pass covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncScope {
    /// Every sheet listed in settings.
    All,
    /// A single named sheet.
    Sheet(String),
}

impl SyncScope {
    fn sheets(&self, settings: &Settings) -> Vec<String> {
        match self {
            SyncScope::All => settings.sheets.clone(),
            SyncScope::Sheet(name) => vec![name.clone()],
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub dry_run: bool,
    /// Clock override; `None` means the current local time.
    pub now: Option<DateTime<Local>>,
}

/// Per-sheet results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetReport {
    pub sheet: String,
    /// Missing or header-only; neither reconciled nor swept.
    pub skipped: bool,
    pub records: Vec<RecordReport>,
    pub committed: bool,
    pub swept: Vec<SweptRow>,
    /// A read or write failure that ended work on this sheet.
    pub error: Option<String>,
}

/// Aggregated counts across a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub registered: usize,
    pub would_register: usize,
    pub completed: usize,
    pub deleted: usize,
    pub expired: usize,
    pub skipped_no_due: usize,
    pub failed: usize,
    pub invalid: usize,
    pub swept: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub dry_run: bool,
    /// Set when the whole pass was skipped.
    pub skipped: Option<String>,
    pub sheets: Vec<SheetReport>,
}

impl SyncReport {
    fn skipped(reason: &str, dry_run: bool) -> Self {
        SyncReport {
            dry_run,
            skipped: Some(reason.to_string()),
            sheets: vec![],
        }
    }

    pub fn totals(&self) -> Totals {
        let mut t = Totals::default();
        for sheet in &self.sheets {
            for r in &sheet.records {
                match r.outcome {
                    RecordOutcome::Registered { .. } => t.registered += 1,
                    RecordOutcome::WouldRegister { .. } => t.would_register += 1,
                    RecordOutcome::Completed => t.completed += 1,
                    RecordOutcome::Deleted => t.deleted += 1,
                    RecordOutcome::Expired => t.expired += 1,
                    RecordOutcome::SkippedNoDue => t.skipped_no_due += 1,
                    RecordOutcome::Failed { .. } => t.failed += 1,
                    RecordOutcome::Invalid { .. } => t.invalid += 1,
                    RecordOutcome::Unchanged => {}
                }
            }
            t.swept += sheet.swept.len();
        }
        t
    }
}

/// Reconcile and sweep the sheets in `scope` with already-loaded config.
///
/// Sheet-level failures are logged and recorded on the [`SheetReport`]; the
/// pass moves on to the next sheet.
pub fn run_pass<St, S>(
    store: &mut St,
    service: &S,
    composer: &TaskComposer,
    settings: &Settings,
    list_id: &str,
    scope: &SyncScope,
    options: SyncOptions,
) -> SyncReport
where
    St: RecordStore + ?Sized,
    S: TaskService + ?Sized,
{
    let now = options.now.unwrap_or_else(Local::now);
    let reconciler = Reconciler {
        service,
        list_id,
        composer,
        now,
        dry_run: options.dry_run,
    };

    let mut reports: Vec<SheetReport> = Vec::new();
    for sheet in scope.sheets(settings) {
        let mut report = SheetReport {
            sheet: sheet.clone(),
            ..SheetReport::default()
        };
        match reconciler.reconcile_sheet(store, &sheet) {
            Ok(Some(result)) => {
                report.records = result.records;
                report.committed = result.committed;
            }
            Ok(None) => report.skipped = true,
            Err(e) => {
                tracing::error!("reconcile failed for sheet '{sheet}': {e}");
                report.error = Some(e.to_string());
            }
        }
        reports.push(report);
    }

    for report in reports.iter_mut().filter(|r| !r.skipped) {
        match sweep_sheet(store, &report.sheet, now, settings.cleanup_days, options.dry_run) {
            Ok(swept) => report.swept = swept,
            Err(e) => {
                tracing::error!("sweep failed for sheet '{}': {e}", report.sheet);
                report.error.get_or_insert_with(|| e.to_string());
            }
        }
    }

    SyncReport {
        dry_run: options.dry_run,
        skipped: None,
        sheets: reports,
    }
}

/// Run one full pass against the file store under `home`.
pub fn run<S: TaskService + ?Sized>(
    home: &Path,
    service: &S,
    scope: SyncScope,
    options: SyncOptions,
) -> Result<SyncReport, SyncError> {
    let settings = Settings::load_at(home)?;
    let props = props::load_at(home)?;
    let Some(list_id) = props.task_list_id else {
        tracing::info!("no task list configured; skipping pass");
        return Ok(SyncReport::skipped("no task list configured", options.dry_run));
    };

    let now = options.now.unwrap_or_else(Local::now);
    let composer = TaskComposer::at(home)?;
    let mut store = FileRecordStore::at(home);
    let report = run_pass(
        &mut store,
        service,
        &composer,
        &settings,
        &list_id,
        &scope,
        SyncOptions {
            now: Some(now),
            ..options
        },
    );

    if !options.dry_run {
        props::update_at(home, |p| p.last_run_at = Some(now.with_timezone(&Utc)))?;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use duesync_tasks::MemoryTaskService;
    use tempfile::TempDir;

    #[test]
    fn run_without_task_list_is_skipped() {
        let home = TempDir::new().expect("home");
        let svc = MemoryTaskService::new();
        let report = run(home.path(), &svc, SyncScope::All, SyncOptions::default()).expect("run");
        assert!(report.skipped.is_some());
        assert!(report.sheets.is_empty());
        assert_eq!(svc.get_calls() + svc.insert_calls(), 0);
    }

    #[test]
    fn single_sheet_scope_ignores_settings_list() {
        let settings = Settings::default();
        let scope = SyncScope::Sheet("Extra".to_string());
        assert_eq!(scope.sheets(&settings), vec!["Extra".to_string()]);
        assert_eq!(SyncScope::All.sheets(&settings), settings.sheets);
    }
}
