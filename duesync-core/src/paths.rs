use std::path::{Path, PathBuf};

pub const SETTINGS_FILE: &str = "settings.yaml";
pub const PROPS_FILE: &str = "props.json";

pub fn duesync_root(home: &Path) -> PathBuf {
    home.join(".duesync")
}

pub fn sheets_dir(home: &Path) -> PathBuf {
    duesync_root(home).join("sheets")
}

pub fn settings_path(home: &Path) -> PathBuf {
    duesync_root(home).join(SETTINGS_FILE)
}

pub fn props_path(home: &Path) -> PathBuf {
    duesync_root(home).join(PROPS_FILE)
}

pub fn templates_dir(home: &Path) -> PathBuf {
    duesync_root(home).join("templates")
}
