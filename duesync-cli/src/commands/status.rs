//! `duesync status`: per-sheet record counts.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use duesync_core::{props, AssignmentRecord, FileRecordStore, RecordStore, Settings, SyncState};

/// Arguments for `duesync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home_dir()?;
        let report = build_report(&home)?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize status JSON")?
            );
        } else {
            print_table(report);
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct StatusReport {
    task_list_id: Option<String>,
    last_run_at: Option<String>,
    trigger_hour: u32,
    cleanup_days: u32,
    sheets: Vec<SheetCounts>,
}

#[derive(Debug, Default, Serialize, Tabled)]
struct SheetCounts {
    #[tabled(rename = "sheet")]
    sheet: String,
    #[tabled(skip)]
    exists: bool,
    #[tabled(rename = "rows")]
    rows: usize,
    #[tabled(rename = "pending")]
    pending: usize,
    #[tabled(rename = "registered")]
    registered: usize,
    #[tabled(rename = "completed")]
    completed: usize,
    #[tabled(rename = "deleted")]
    deleted: usize,
    #[tabled(rename = "expired")]
    expired: usize,
    #[tabled(rename = "invalid")]
    invalid: usize,
}

fn build_report(home: &Path) -> Result<StatusReport> {
    let settings = Settings::load_at(home).context("failed to read settings")?;
    let saved = props::load_at(home).context("failed to read props")?;
    let store = FileRecordStore::at(home);

    // Tracked sheets first, then any extra sheet found on disk.
    let mut names = settings.sheets.clone();
    for extra in store.list_sheets().context("failed to list sheets")? {
        if !names.contains(&extra) {
            names.push(extra);
        }
    }

    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let rows = store
            .read_rows(&name)
            .with_context(|| format!("failed to read sheet '{name}'"))?;
        sheets.push(count_sheet(name, rows));
    }

    Ok(StatusReport {
        task_list_id: saved.task_list_id,
        last_run_at: saved
            .last_run_at
            .map(|at| at.with_timezone(&Local).format("%Y/%m/%d %H:%M").to_string()),
        trigger_hour: settings.trigger_hour,
        cleanup_days: settings.cleanup_days,
        sheets,
    })
}

fn count_sheet(sheet: String, rows: Option<Vec<duesync_core::Row>>) -> SheetCounts {
    let mut counts = SheetCounts {
        sheet,
        ..SheetCounts::default()
    };
    let Some(rows) = rows else {
        return counts;
    };
    counts.exists = true;
    for row in rows.iter().skip(1) {
        counts.rows += 1;
        match AssignmentRecord::from_row(row).map(|r| r.state) {
            Ok(SyncState::Pending) => counts.pending += 1,
            Ok(SyncState::Registered { .. }) => counts.registered += 1,
            Ok(SyncState::Completed { .. }) => counts.completed += 1,
            Ok(SyncState::Deleted { .. }) => counts.deleted += 1,
            Ok(SyncState::Expired) => counts.expired += 1,
            Err(_) => counts.invalid += 1,
        }
    }
    counts
}

fn print_table(report: StatusReport) {
    let list = report
        .task_list_id
        .as_deref()
        .map(|id| id.green().to_string())
        .unwrap_or_else(|| "not configured".yellow().to_string());
    println!("duesync v{} | task list: {list}", env!("CARGO_PKG_VERSION"));
    println!(
        "last run: {} | daily at {:02}:00 | cleanup after {} days",
        report.last_run_at.as_deref().unwrap_or("never"),
        report.trigger_hour,
        report.cleanup_days,
    );

    let missing: Vec<String> = report
        .sheets
        .iter()
        .filter(|s| !s.exists)
        .map(|s| s.sheet.clone())
        .collect();

    let mut table = Table::new(report.sheets);
    table.with(Style::rounded());
    println!("{table}");

    if !missing.is_empty() {
        println!(
            "{} missing sheet(s): {}. Run `duesync init`.",
            "!".yellow(),
            missing.join(", ")
        );
    }
}
