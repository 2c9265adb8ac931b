//! `duesync ingest <sheet> <file.json> --kind portal|classroom`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use duesync_core::ingest::{classroom_row, merge_rows, portal_row, ClassroomWork, PortalAssignment};
use duesync_core::{FileRecordStore, RecordStore, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IngestKind {
    /// Array of `{course, title, start, end, link}`.
    Portal,
    /// Array of `{course, title, dueDate, dueTime, link}`.
    Classroom,
}

/// Merge a scraped batch into a sheet.
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Target sheet name.
    pub sheet: String,

    /// JSON file holding the batch.
    pub file: PathBuf,

    /// Shape of the batch.
    #[arg(long, value_enum)]
    pub kind: IngestKind,
}

impl IngestArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home_dir()?;
        let raw = std::fs::read_to_string(&self.file)
            .with_context(|| format!("cannot read '{}'", self.file.display()))?;

        let (incoming, dropped) = decode_batch(self.kind, &raw)
            .with_context(|| format!("'{}' is not a valid {:?} batch", self.file.display(), self.kind))?;

        let mut store = FileRecordStore::at(&home);
        let existing = store
            .read_rows(&self.sheet)
            .with_context(|| format!("failed to read sheet '{}'", self.sheet))?
            .unwrap_or_default();
        let (merged, appended) = merge_rows(existing, &incoming);
        store
            .write_rows(&self.sheet, &merged)
            .with_context(|| format!("failed to write sheet '{}'", self.sheet))?;

        println!(
            "✓ '{}': {} new, {} updated",
            self.sheet,
            appended,
            incoming.len() - appended
        );
        if dropped > 0 {
            println!("  {dropped} item(s) without a due date skipped");
        }
        Ok(())
    }
}

/// Rows for the batch plus how many items could not become rows.
fn decode_batch(kind: IngestKind, raw: &str) -> Result<(Vec<Row>, usize)> {
    match kind {
        IngestKind::Portal => {
            let items: Vec<PortalAssignment> = serde_json::from_str(raw)?;
            Ok((items.iter().map(portal_row).collect(), 0))
        }
        IngestKind::Classroom => {
            let items: Vec<ClassroomWork> = serde_json::from_str(raw)?;
            let rows: Vec<Row> = items.iter().filter_map(classroom_row).collect();
            let dropped = items.len() - rows.len();
            Ok((rows, dropped))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classroom_items_without_due_are_counted() {
        let raw = r#"[
            {"course": "Bio", "title": "Lab", "dueDate": {"year": 2024, "month": 5, "day": 1}, "link": "l"},
            {"course": "Bio", "title": "Reading", "link": "l"}
        ]"#;
        let (rows, dropped) = decode_batch(IngestKind::Classroom, raw).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(dropped, 1);
        assert_eq!(rows[0][4], "2024/05/01 00:00");
    }

    #[test]
    fn portal_batch_must_be_an_array() {
        assert!(decode_batch(IngestKind::Portal, r#"{"course": "x"}"#).is_err());
    }
}
