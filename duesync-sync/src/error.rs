//! Error types for duesync-sync.

use thiserror::Error;

use duesync_core::{SettingsError, StoreError};
use duesync_renderer::RenderError;
use duesync_tasks::TaskServiceError;

/// Pass-level failures. Per-record failures never surface here; they are
/// reported as [`crate::engine::RecordOutcome::Failed`].
#[derive(Debug, Error)]
pub enum SyncError {
    /// The settings file exists but cannot be read or parsed.
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    /// A sheet or `props.json` could not be read or written.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The task templates failed to load.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("task service error: {0}")]
    Tasks(#[from] TaskServiceError),
}
