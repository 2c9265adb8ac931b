//! Sheet-backed record storage.
//!
//! # Storage layout
//!
//! ```text
//! ~/.duesync/
//!   sheets/
//!     WebClass.yaml     (mode 0600; sequence of rows, row 0 is the header)
//!     Classroom.yaml
//! ```
//!
//! # API pattern
//!
//! [`FileRecordStore::at`] takes an explicit home and is what tests use with a
//! `TempDir`; [`FileRecordStore::open`] derives home from `dirs::home_dir()`.
//! [`MemoryRecordStore`] keeps everything in process.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{io_err, StoreError};
use crate::paths;
use crate::types::{header_row, Row};

/// An ordered table of rows per named sheet.
///
/// Reads return every row, header included. Writes replace the whole sheet in
/// one commit.
pub trait RecordStore {
    /// All rows of `sheet`, or `None` when the sheet does not exist.
    fn read_rows(&self, sheet: &str) -> Result<Option<Vec<Row>>, StoreError>;

    /// Replace every row of `sheet`, creating it if needed.
    fn write_rows(&mut self, sheet: &str, rows: &[Row]) -> Result<(), StoreError>;

    /// Delete the row at `index`. Rows after it shift up by one.
    fn delete_row(&mut self, sheet: &str, index: usize) -> Result<(), StoreError>;

    /// Names of every existing sheet, sorted.
    fn list_sheets(&self) -> Result<Vec<String>, StoreError>;

    /// Create `sheet` with only the header row if it does not exist yet.
    /// Returns `true` when the sheet was created.
    fn ensure_sheet(&mut self, sheet: &str) -> Result<bool, StoreError> {
        if self.read_rows(sheet)?.is_some() {
            return Ok(false);
        }
        self.write_rows(sheet, &[header_row()])?;
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// 1. File store
// ---------------------------------------------------------------------------

/// YAML-file-per-sheet store under `<home>/.duesync/sheets/`.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    dir: PathBuf,
}

impl FileRecordStore {
    /// Store rooted at `<home>/.duesync/sheets/`.
    pub fn at(home: &Path) -> Self {
        Self {
            dir: paths::sheets_dir(home),
        }
    }

    /// Store rooted at the current user's home directory.
    pub fn open() -> Result<Self, StoreError> {
        let home = dirs::home_dir().ok_or(StoreError::HomeNotFound)?;
        Ok(Self::at(&home))
    }

    /// `<dir>/<sheet>.yaml`. Pure, no I/O.
    pub fn sheet_path(&self, sheet: &str) -> PathBuf {
        self.dir.join(format!("{sheet}.yaml"))
    }

    fn ensure_dir(&self) -> Result<(), StoreError> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir).map_err(|e| io_err(&self.dir, e))?;
            set_dir_permissions(&self.dir)?;
        }
        Ok(())
    }
}

impl RecordStore for FileRecordStore {
    fn read_rows(&self, sheet: &str) -> Result<Option<Vec<Row>>, StoreError> {
        let path = self.sheet_path(sheet);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        if contents.trim().is_empty() {
            return Ok(Some(vec![]));
        }
        let rows: Vec<Row> =
            serde_yaml::from_str(&contents).map_err(|source| StoreError::Parse { path, source })?;
        Ok(Some(rows))
    }

    /// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
    fn write_rows(&mut self, sheet: &str, rows: &[Row]) -> Result<(), StoreError> {
        self.ensure_dir()?;
        let path = self.sheet_path(sheet);
        let tmp_path = path.with_file_name(format!("{sheet}.yaml.tmp"));

        let yaml = serde_yaml::to_string(rows)?;
        std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
        set_file_permissions(&tmp_path).map_err(|e| io_err(&tmp_path, e))?;
        if let Err(e) = std::fs::rename(&tmp_path, &path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(io_err(&path, e));
        }
        Ok(())
    }

    fn delete_row(&mut self, sheet: &str, index: usize) -> Result<(), StoreError> {
        let mut rows = self
            .read_rows(sheet)?
            .ok_or_else(|| StoreError::SheetNotFound(sheet.to_string()))?;
        if index >= rows.len() {
            return Err(StoreError::RowOutOfRange {
                sheet: sheet.to_string(),
                index,
                len: rows.len(),
            });
        }
        rows.remove(index);
        self.write_rows(sheet, &rows)
    }

    fn list_sheets(&self) -> Result<Vec<String>, StoreError> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }
        let mut names: Vec<String> = std::fs::read_dir(&self.dir)
            .map_err(|e| io_err(&self.dir, e))?
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                name.strip_suffix(".yaml").map(str::to_string)
            })
            .collect();
        names.sort();
        Ok(names)
    }
}

// ---------------------------------------------------------------------------
// 2. In-memory store
// ---------------------------------------------------------------------------

/// In-process store. Counts whole-sheet writes so callers can assert that
/// unchanged sheets are not rewritten.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    sheets: BTreeMap<String, Vec<Row>>,
    writes: usize,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a sheet without counting it as a write.
    pub fn with_sheet(mut self, sheet: &str, rows: Vec<Row>) -> Self {
        self.sheets.insert(sheet.to_string(), rows);
        self
    }

    /// Number of `write_rows` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl RecordStore for MemoryRecordStore {
    fn read_rows(&self, sheet: &str) -> Result<Option<Vec<Row>>, StoreError> {
        Ok(self.sheets.get(sheet).cloned())
    }

    fn write_rows(&mut self, sheet: &str, rows: &[Row]) -> Result<(), StoreError> {
        self.writes += 1;
        self.sheets.insert(sheet.to_string(), rows.to_vec());
        Ok(())
    }

    fn delete_row(&mut self, sheet: &str, index: usize) -> Result<(), StoreError> {
        let rows = self
            .sheets
            .get_mut(sheet)
            .ok_or_else(|| StoreError::SheetNotFound(sheet.to_string()))?;
        if index >= rows.len() {
            return Err(StoreError::RowOutOfRange {
                sheet: sheet.to_string(),
                index,
                len: rows.len(),
            });
        }
        rows.remove(index);
        Ok(())
    }

    fn list_sheets(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.sheets.keys().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

#[cfg(unix)]
pub(crate) fn set_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
pub(crate) fn set_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

/// Owner-only (0600) mode for files about to be renamed into place.
#[cfg(unix)]
pub(crate) fn set_file_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}
#[cfg(not(unix))]
pub(crate) fn set_file_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn data_row(title: &str) -> Row {
        vec![
            "WebClass".into(),
            "Math".into(),
            title.into(),
            String::new(),
            "2024/05/01".into(),
            "https://example.test".into(),
            String::new(),
            String::new(),
        ]
    }

    #[test]
    fn sheet_path_is_correct() {
        let home = TempDir::new().expect("tempdir");
        let store = FileRecordStore::at(home.path());
        assert!(store
            .sheet_path("WebClass")
            .ends_with(".duesync/sheets/WebClass.yaml"));
    }

    #[test]
    fn missing_sheet_reads_as_none() {
        let home = TempDir::new().expect("tempdir");
        let store = FileRecordStore::at(home.path());
        assert!(store.read_rows("WebClass").expect("read").is_none());
    }

    #[test]
    fn write_then_read_preserves_order() {
        let home = TempDir::new().expect("tempdir");
        let mut store = FileRecordStore::at(home.path());
        let rows = vec![header_row(), data_row("a"), data_row("b")];
        store.write_rows("WebClass", &rows).expect("write");
        let loaded = store.read_rows("WebClass").expect("read").expect("exists");
        assert_eq!(loaded, rows);
    }

    #[test]
    fn atomic_write_cleans_up_tmp() {
        let home = TempDir::new().expect("tempdir");
        let mut store = FileRecordStore::at(home.path());
        store.write_rows("WebClass", &[header_row()]).expect("write");
        let tmp = store
            .sheet_path("WebClass")
            .with_file_name("WebClass.yaml.tmp");
        assert!(!tmp.exists(), ".tmp must be gone after successful save");
    }

    #[test]
    fn delete_row_shifts_later_rows() {
        let home = TempDir::new().expect("tempdir");
        let mut store = FileRecordStore::at(home.path());
        let rows = vec![header_row(), data_row("a"), data_row("b"), data_row("c")];
        store.write_rows("WebClass", &rows).expect("write");
        store.delete_row("WebClass", 2).expect("delete");
        let loaded = store.read_rows("WebClass").expect("read").expect("exists");
        let titles: Vec<&str> = loaded.iter().skip(1).map(|r| r[2].as_str()).collect();
        assert_eq!(titles, vec!["a", "c"]);
    }

    #[test]
    fn delete_out_of_range_errors() {
        let mut store = MemoryRecordStore::new().with_sheet("S", vec![header_row()]);
        let err = store.delete_row("S", 3).unwrap_err();
        assert!(matches!(err, StoreError::RowOutOfRange { index: 3, len: 1, .. }));
    }

    #[test]
    fn ensure_sheet_is_idempotent() {
        let home = TempDir::new().expect("tempdir");
        let mut store = FileRecordStore::at(home.path());
        assert!(store.ensure_sheet("Classroom").expect("first"));
        assert!(!store.ensure_sheet("Classroom").expect("second"));
        assert_eq!(store.list_sheets().expect("list"), vec!["Classroom".to_string()]);
    }

    #[test]
    fn memory_store_counts_writes() {
        let mut store = MemoryRecordStore::new().with_sheet("S", vec![header_row()]);
        assert_eq!(store.write_count(), 0);
        store.write_rows("S", &[header_row()]).expect("write");
        assert_eq!(store.write_count(), 1);
    }
}
