//! Machine-written properties: the resolved task list id and the time of the
//! last completed pass.
//!
//! Persists a [`Props`] JSON document at `<home>/.duesync/props.json`.
//! Writes use the same atomic `.tmp` + rename pattern as the sheet store.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{io_err, StoreError};
use crate::paths;
use crate::store::set_file_permissions;

/// On-disk properties payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Props {
    /// Remote task list that receives new tasks. Unset until `duesync tasklist`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_list_id: Option<String>,
    /// When the last non-dry-run pass finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,
}

/// Load the props file. Returns defaults if it does not yet exist.
pub fn load_at(home: &Path) -> Result<Props, StoreError> {
    let path = paths::props_path(home);
    if !path.exists() {
        return Ok(Props::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Save the props file atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_at(home: &Path, props: &Props) -> Result<(), StoreError> {
    let path = paths::props_path(home);
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid props path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(props)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// Load, apply `f`, save.
pub fn update_at(home: &Path, f: impl FnOnce(&mut Props)) -> Result<Props, StoreError> {
    let mut props = load_at(home)?;
    f(&mut props);
    save_at(home, &props)?;
    Ok(props)
}
