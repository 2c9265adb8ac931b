pub mod daemon;
pub mod ingest;
pub mod init;
pub mod status;
pub mod sync;
pub mod tasklist;

use std::path::PathBuf;

use anyhow::{Context, Result};

pub(crate) fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}
