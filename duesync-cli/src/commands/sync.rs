//! `duesync sync`: one reconciliation pass.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use duesync_core::props;
use duesync_sync::{run, RecordOutcome, SheetReport, SyncOptions, SyncReport, SyncScope};
use duesync_tasks::GoogleTasksClient;

/// Arguments for `duesync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Only this sheet (default: every tracked sheet).
    pub sheet: Option<String>,

    /// Report what would change without touching sheets or the task list.
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home_dir()?;

        // Checked up front so an unconfigured setup needs no token.
        let saved = props::load_at(&home).context("failed to read props")?;
        if saved.task_list_id.is_none() {
            println!("No task list configured. Run `duesync tasklist` first.");
            return Ok(());
        }

        let client = GoogleTasksClient::from_env().context("cannot reach the task service")?;
        let scope = match self.sheet {
            Some(sheet) => SyncScope::Sheet(sheet),
            None => SyncScope::All,
        };
        let report = run(
            &home,
            &client,
            scope,
            SyncOptions {
                dry_run: self.dry_run,
                now: None,
            },
        )
        .context("sync failed")?;

        print_report(&report);
        Ok(())
    }
}

pub(crate) fn print_report(report: &SyncReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    if let Some(reason) = &report.skipped {
        println!("{prefix}· pass skipped: {reason}");
        return;
    }

    for sheet in &report.sheets {
        print_sheet(prefix, sheet);
    }

    let t = report.totals();
    println!(
        "{prefix}Totals: {} registered, {} completed, {} deleted, {} expired, {} swept, {} failed",
        t.registered + t.would_register,
        t.completed,
        t.deleted,
        t.expired,
        t.swept,
        t.failed,
    );
}

fn print_sheet(prefix: &str, sheet: &SheetReport) {
    if sheet.skipped {
        println!("{prefix}· '{}' skipped (missing or empty)", sheet.sheet);
        return;
    }
    if let Some(err) = &sheet.error {
        println!("{prefix}{} '{}': {err}", "✗".red(), sheet.sheet);
    }

    let changed: Vec<_> = sheet
        .records
        .iter()
        .filter(|r| !matches!(r.outcome, RecordOutcome::Unchanged | RecordOutcome::SkippedNoDue))
        .collect();
    if changed.is_empty() && sheet.swept.is_empty() {
        println!("{prefix}✓ '{}' nothing to do", sheet.sheet);
        return;
    }

    println!("{prefix}✓ '{}'", sheet.sheet);
    for r in changed {
        let line = format!("[{}] {}", r.course, r.title);
        match &r.outcome {
            RecordOutcome::Registered { task_id } => {
                println!("  {}  {line} ({})", "+".green(), task_id.0)
            }
            RecordOutcome::WouldRegister { .. } => println!("  {}  {line}", "~".green()),
            RecordOutcome::Completed => println!("  {}  {line} completed", "✓".green()),
            RecordOutcome::Deleted => println!("  {}  {line} deleted remotely", "-".yellow()),
            RecordOutcome::Expired => println!("  {}  {line} expired", "·".bright_black()),
            RecordOutcome::Failed { reason } => println!("  {}  {line}: {reason}", "✗".red()),
            RecordOutcome::Invalid { reason } => {
                println!("  {}  row {}: {reason}", "?".yellow(), r.row)
            }
            RecordOutcome::Unchanged | RecordOutcome::SkippedNoDue => {}
        }
    }
    for s in &sheet.swept {
        let verb = if s.deleted { "removed" } else { "would remove" };
        println!("  {}  [{}] {} {verb}", "⌫".bright_black(), s.course, s.title);
    }
}
