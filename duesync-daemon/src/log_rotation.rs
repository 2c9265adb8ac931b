//! Size-based rotation and tailing for the daemon log.
//!
//! `daemon.log` rolls over to `daemon.log.1` once it reaches 10 MiB; older
//! copies shift up and anything past `daemon.log.5` is dropped.

use std::collections::VecDeque;
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

pub const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;
pub const MAX_ROTATED_FILES: usize = 5;

/// Roll `log_path` over when it is at least `max_bytes` long.
///
/// Returns whether a rotation happened. A missing log is not an error.
pub fn rotate_if_needed(log_path: &Path, max_bytes: u64, max_files: usize) -> io::Result<bool> {
    let size = match fs::metadata(log_path) {
        Ok(meta) => meta.len(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    if size < max_bytes || max_files == 0 {
        return Ok(false);
    }

    let oldest = rotated_path(log_path, max_files);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for n in (1..max_files).rev() {
        let from = rotated_path(log_path, n);
        if from.exists() {
            fs::rename(&from, rotated_path(log_path, n + 1))?;
        }
    }
    fs::rename(log_path, rotated_path(log_path, 1))?;
    Ok(true)
}

/// Rotate the daemon log under `home`; failures are only logged.
pub fn rotate_logs(home: &Path) {
    let log = crate::paths::log_path(home);
    match rotate_if_needed(&log, MAX_LOG_BYTES, MAX_ROTATED_FILES) {
        Ok(true) => tracing::info!(path = %log.display(), "log file rotated"),
        Ok(false) => {}
        Err(err) => tracing::warn!(path = %log.display(), error = %err, "log rotation failed"),
    }
}

/// Last `count` lines of the daemon log. A missing log yields no lines.
pub fn tail_lines(log_path: &Path, count: usize) -> io::Result<Vec<String>> {
    let file = match fs::File::open(log_path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
        Err(err) => return Err(err),
    };

    let mut window: VecDeque<String> = VecDeque::with_capacity(count);
    for line in BufReader::new(file).lines() {
        if count == 0 {
            break;
        }
        if window.len() == count {
            window.pop_front();
        }
        window.push_back(line?);
    }
    Ok(window.into())
}

fn rotated_path(base: &Path, n: usize) -> PathBuf {
    let name = base
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(crate::paths::DAEMON_LOG);
    base.with_file_name(format!("{name}.{n}"))
}
