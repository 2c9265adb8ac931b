use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot load settings: {0}")]
    Settings(#[from] duesync_core::SettingsError),

    #[error("pass failed: {0}")]
    Sync(#[from] duesync_sync::SyncError),

    #[error("task service unavailable: {0}")]
    Tasks(#[from] duesync_tasks::TaskServiceError),

    #[error("malformed control message: {0}")]
    Json(#[from] serde_json::Error),

    /// The sync queue or a job's reply channel went away.
    #[error("{0} closed before the job finished")]
    QueueClosed(&'static str),

    #[error("cannot install signal handler for {0}")]
    Signal(String),

    /// The peer answered with `ok: false`, or the exchange broke off.
    #[error("{0}")]
    Protocol(String),

    #[error("no daemon is listening on {socket}")]
    NotRunning { socket: PathBuf },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
