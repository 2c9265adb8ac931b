//! User settings read from `~/.duesync/settings.yaml`.
//!
//! The file is a flat key/value mapping:
//!
//! ```yaml
//! CLEANUP_DAYS: 30
//! TASKS_LIST_NAME: Assignments
//! TRIGGER_HOUR: 6
//! SHEETS: [WebClass, Classroom]
//! ```
//!
//! Each key falls back to its default when missing or of the wrong shape,
//! with a warning. Only an unreadable or unparsable file is an error.

use std::collections::BTreeMap;
use std::path::Path;

use serde_yaml::Value;

use crate::error::SettingsError;
use crate::paths;
use crate::store::set_file_permissions;

pub const KEY_CLEANUP_DAYS: &str = "CLEANUP_DAYS";
pub const KEY_TASKS_LIST_NAME: &str = "TASKS_LIST_NAME";
pub const KEY_TRIGGER_HOUR: &str = "TRIGGER_HOUR";
pub const KEY_SHEETS: &str = "SHEETS";

pub const DEFAULT_CLEANUP_DAYS: u32 = 30;
pub const DEFAULT_TASKS_LIST_NAME: &str = "Assignments";
pub const DEFAULT_TRIGGER_HOUR: u32 = 6;
pub const DEFAULT_SHEETS: [&str; 2] = ["WebClass", "Classroom"];

/// Resolved settings for one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Days after the due date before a finished or never-registered row is purged.
    pub cleanup_days: u32,
    /// Title of the remote task list that receives new tasks.
    pub tasks_list_name: String,
    /// Local hour (0–23) at which the daemon runs its daily pass.
    pub trigger_hour: u32,
    /// Tracked sheet names, in processing order.
    pub sheets: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cleanup_days: DEFAULT_CLEANUP_DAYS,
            tasks_list_name: DEFAULT_TASKS_LIST_NAME.to_string(),
            trigger_hour: DEFAULT_TRIGGER_HOUR,
            sheets: DEFAULT_SHEETS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Settings {
    /// Resolve settings from a raw key/value map, defaulting per key.
    pub fn from_map(map: &BTreeMap<String, Value>) -> Self {
        let defaults = Settings::default();

        let cleanup_days = match map.get(KEY_CLEANUP_DAYS) {
            None => defaults.cleanup_days,
            Some(value) => as_u32(value).unwrap_or_else(|| {
                log::warn!(
                    "{KEY_CLEANUP_DAYS} is not a non-negative integer ({value:?}); using default {}",
                    defaults.cleanup_days
                );
                defaults.cleanup_days
            }),
        };

        let tasks_list_name = match map.get(KEY_TASKS_LIST_NAME) {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            None => defaults.tasks_list_name.clone(),
            Some(other) => {
                log::warn!("{KEY_TASKS_LIST_NAME} is not text ({other:?}); using default");
                defaults.tasks_list_name.clone()
            }
        };

        let trigger_hour = match map.get(KEY_TRIGGER_HOUR).map(|v| (v, as_u32(v))) {
            None => defaults.trigger_hour,
            Some((_, Some(hour))) if hour < 24 => hour,
            Some((value, _)) => {
                log::warn!(
                    "{KEY_TRIGGER_HOUR} must be an hour 0-23 ({value:?}); using default {}",
                    defaults.trigger_hour
                );
                defaults.trigger_hour
            }
        };

        let sheets = match map.get(KEY_SHEETS) {
            None => defaults.sheets.clone(),
            Some(Value::Sequence(items)) => {
                let names: Vec<String> = items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                if names.is_empty() {
                    defaults.sheets.clone()
                } else {
                    names
                }
            }
            Some(other) => {
                log::warn!("{KEY_SHEETS} is not a list ({other:?}); using default");
                defaults.sheets.clone()
            }
        };

        Settings {
            cleanup_days,
            tasks_list_name,
            trigger_hour,
            sheets,
        }
    }

    /// Load `<home>/.duesync/settings.yaml`. A missing file yields defaults.
    pub fn load_at(home: &Path) -> Result<Self, SettingsError> {
        let path = paths::settings_path(home);
        if !path.exists() {
            log::info!("no settings at {}; using defaults", path.display());
            return Ok(Settings::default());
        }
        let contents = std::fs::read_to_string(&path).map_err(|source| SettingsError::Io {
            path: path.clone(),
            source,
        })?;
        if contents.trim().is_empty() {
            return Ok(Settings::default());
        }
        let map: BTreeMap<String, Value> = serde_yaml::from_str(&contents)
            .map_err(|source| SettingsError::Parse { path, source })?;
        Ok(Settings::from_map(&map))
    }

    /// `load_at` convenience wrapper.
    pub fn load() -> Result<Self, SettingsError> {
        let home = dirs::home_dir().ok_or(SettingsError::HomeNotFound)?;
        Settings::load_at(&home)
    }

    /// Serialize to the flat key/value mapping.
    pub fn to_map(&self) -> BTreeMap<String, Value> {
        let mut map = BTreeMap::new();
        map.insert(KEY_CLEANUP_DAYS.to_string(), Value::from(self.cleanup_days));
        map.insert(
            KEY_TASKS_LIST_NAME.to_string(),
            Value::from(self.tasks_list_name.clone()),
        );
        map.insert(KEY_TRIGGER_HOUR.to_string(), Value::from(self.trigger_hour));
        map.insert(
            KEY_SHEETS.to_string(),
            Value::Sequence(self.sheets.iter().cloned().map(Value::from).collect()),
        );
        map
    }

    /// Write `settings.yaml` if it does not exist yet. Returns `true` when a
    /// file was created. Existing user settings are never overwritten.
    pub fn scaffold_at(home: &Path) -> Result<bool, SettingsError> {
        let path = paths::settings_path(home);
        if path.exists() {
            return Ok(false);
        }
        let io = |source: std::io::Error| SettingsError::Io {
            path: path.clone(),
            source,
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(io)?;
        }
        let yaml = serde_yaml::to_string(&Settings::default().to_map())?;
        let tmp = path.with_extension("yaml.tmp");
        std::fs::write(&tmp, yaml).map_err(io)?;
        set_file_permissions(&tmp).map_err(|source| SettingsError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(io)?;
        Ok(true)
    }
}

fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
